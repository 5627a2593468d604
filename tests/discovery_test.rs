//! 账户发现引擎测试

mod common;

use std::{sync::Arc, time::Duration};

use common::{DeviceCall, MockBackend, MockDevice};
use ironconnect::{
    config::DiscoveryConfig,
    domain::network::NetworkRegistry,
    service::discovery::{DiscoveryEngine, DiscoveryEvent, DiscoveryStatus},
};

fn engine(device: Arc<MockDevice>, backend: Arc<MockBackend>, coin: &str, gap_limit: u32) -> DiscoveryEngine {
    let registry = NetworkRegistry::new();
    let network = registry.get_by_coin(coin).unwrap().clone();
    DiscoveryEngine::new(
        device,
        backend,
        network,
        &DiscoveryConfig {
            gap_limit,
            enable_taproot: true,
            scan_page_size: 1,
        },
    )
}

async fn run_to_end(engine: &mut DiscoveryEngine) -> Vec<DiscoveryEvent> {
    let mut events = engine.start().unwrap();
    let mut seen = Vec::new();
    while let Some(event) = events.recv().await {
        seen.push(event);
    }
    engine.join().await;
    seen
}

#[tokio::test]
async fn test_gap_limit_per_account_type() {
    let used = |path: &str| MockDevice::descriptor_for("btc", path);
    // p2tr: 0 已用, 1 空, 2 已用, 3 空, 4 空 -> 扫描到 4 为止
    let backend = Arc::new(
        MockBackend::new()
            .with_used(&used("m/86'/0'/0'"))
            .with_used(&used("m/86'/0'/2'"))
            .with_used(&used("m/84'/0'/0'")),
    );
    let device = Arc::new(MockDevice::new());
    let mut engine = engine(device.clone(), backend, "btc", 2);

    let events = run_to_end(&mut engine).await;
    assert_eq!(engine.status(), DiscoveryStatus::Completed);
    assert_eq!(events.last(), Some(&DiscoveryEvent::Completed));

    let accounts = engine.accounts();
    let count = |id: &str| accounts.iter().filter(|a| a.account_type == id).count();
    assert_eq!(count("p2tr"), 5);
    assert_eq!(count("p2wpkh"), 3);
    assert_eq!(count("p2sh"), 2);
    assert_eq!(count("p2pkh"), 2);

    // 空账户同样计入列表，顺序与扫描顺序一致
    assert_eq!(accounts[0].path.serialize(), "m/86'/0'/0'");
    assert!(!accounts[0].empty);
    assert!(accounts[1].empty);
    assert_eq!(accounts[1].label, "taproot account #2");

    // 设备从未被要求扫描超出 gap limit 的索引
    assert!(!device.calls().contains(&DeviceCall::Descriptor {
        path: "m/86'/0'/5'".into()
    }));
}

#[tokio::test]
async fn test_progress_carries_accounts_so_far() {
    let backend = Arc::new(MockBackend::new());
    let mut engine = engine(Arc::new(MockDevice::new()), backend, "ltc", 1);

    let events = run_to_end(&mut engine).await;
    let lengths: Vec<usize> = events
        .iter()
        .filter_map(|e| match e {
            DiscoveryEvent::Progress(accounts) => Some(accounts.len()),
            _ => None,
        })
        .collect();
    // ltc 不支持 taproot: p2wpkh, p2sh, p2pkh
    assert_eq!(lengths, vec![1, 2, 3]);
    let ids: Vec<&str> = engine.account_types().iter().map(|t| t.id.as_str()).collect();
    assert_eq!(ids, vec!["p2wpkh", "p2sh", "p2pkh"]);
}

#[tokio::test]
async fn test_stop_before_start_and_twice() {
    let mut engine = engine(
        Arc::new(MockDevice::new()),
        Arc::new(MockBackend::new()),
        "eth",
        1,
    );
    engine.stop();
    engine.stop();
    assert_eq!(engine.status(), DiscoveryStatus::Stopped);
    assert!(!engine.has_listener());
    assert!(engine.start().is_err());
    engine.join().await;
}

#[tokio::test]
async fn test_stop_while_scanning_closes_channel() {
    let device = Arc::new(MockDevice::new().with_descriptor_delay(Duration::from_millis(5)));
    let mut backend = MockBackend::new();
    for index in 0..100 {
        backend = backend.with_used(&MockDevice::descriptor_for(
            "eth",
            &format!("m/44'/60'/{}'/0/0", index),
        ));
    }
    let mut engine = engine(device.clone(), Arc::new(backend), "eth", 1);

    let mut events = engine.start().unwrap();
    assert_eq!(engine.status(), DiscoveryStatus::Scanning);
    assert!(matches!(events.recv().await, Some(DiscoveryEvent::Progress(_))));

    engine.stop();
    engine.stop();
    assert!(!engine.has_listener());
    engine.join().await;

    // 通道关闭后只剩已缓冲的事件
    while let Some(event) = events.recv().await {
        assert!(matches!(event, DiscoveryEvent::Progress(_)));
    }
    assert_eq!(engine.status(), DiscoveryStatus::Stopped);
    let scanned = device.calls().len();
    assert!(scanned < 100);

    // 停止后不再有设备调用
    tokio::time::sleep(Duration::from_millis(20)).await;
    assert_eq!(device.calls().len(), scanned);
}

#[tokio::test]
async fn test_failure_is_reported_as_event() {
    let backend = Arc::new(
        MockBackend::new().failing(ironconnect::ConnectError::Backend("offline".into())),
    );
    let mut engine = engine(Arc::new(MockDevice::new()), backend, "eth", 1);

    let events = run_to_end(&mut engine).await;
    assert_eq!(
        events,
        vec![DiscoveryEvent::Failed(ironconnect::ConnectError::Backend(
            "offline".into()
        ))]
    );
    assert_eq!(engine.status(), DiscoveryStatus::Stopped);
    assert!(engine.accounts().is_empty());
}
