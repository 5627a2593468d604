//! 日志脱敏
//! 地址与描述符在 info 级别日志中只显示首尾字符

/// 脱敏地址（显示前6位和后4位）
pub fn redact_address(address: &str) -> String {
    let chars: Vec<char> = address.chars().collect();
    if chars.len() < 10 {
        return "*".repeat(chars.len());
    }

    let prefix: String = chars[..6].iter().collect();
    let suffix: String = chars[chars.len() - 4..].iter().collect();
    format!("{}...{}", prefix, suffix)
}

/// 脱敏账户描述符（xpub 等较长字符串）
pub fn redact_descriptor(descriptor: &str) -> String {
    let chars: Vec<char> = descriptor.chars().collect();
    if chars.len() <= 16 {
        return redact_address(descriptor);
    }
    let prefix: String = chars[..8].iter().collect();
    let suffix: String = chars[chars.len() - 6..].iter().collect();
    format!("{}...{}", prefix, suffix)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_redact_address() {
        assert_eq!(
            redact_address("bc1qar0srrr7xfkvy5l643lydnw9re59gtzzwf5mdq"),
            "bc1qar...5mdq"
        );
        assert_eq!(redact_address("short"), "*****");
    }

    #[test]
    fn test_redact_descriptor() {
        let xpub = "xpub6BosfCnifzxcFwrSzQiqu2DBVTshkCXacvNsWGYJVVhhawA7d4R5WSWGFNbi8Aw6ZRc1brxMyWMzG3DSSSSoekkudhUd9yLb6qx39T9nMdj";
        assert_eq!(redact_descriptor(xpub), "xpub6Bos...T9nMdj");
    }
}
