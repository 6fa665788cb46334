/// 获取当前 UTC 时间戳（毫秒）
pub fn now_millis() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

/// Generate a Snowflake-style i64 for use as resource ID.
///
/// Layout (53 bits, fits in JavaScript's Number.MAX_SAFE_INTEGER):
///   - 41 bits: milliseconds since 2024-01-01 UTC (~69 years)
///   - 12 bits: random (4096 values per ms, collision-free at marketplace scale)
pub fn snowflake_id() -> i64 {
    use rand::Rng;
    // Custom epoch: 2024-01-01 00:00:00 UTC
    const EPOCH_MS: i64 = 1_704_067_200_000;
    let now = now_millis();
    let ts = (now - EPOCH_MS) & 0x1FF_FFFF_FFFF; // 41 bits
    let rand_bits: i64 = rand::thread_rng().gen_range(0..0x1000); // 12 bits
    (ts << 12) | rand_bits
}

/// Generate an alphanumeric token of the given length (payment references,
/// password-reset tokens).
pub fn random_token(len: usize) -> String {
    use rand::Rng;
    const CHARS: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789";
    let mut rng = rand::thread_rng();
    (0..len)
        .map(|_| CHARS[rng.gen_range(0..CHARS.len())] as char)
        .collect()
}

/// Generate a 6-digit one-time code for password reset mails.
pub fn random_otp() -> String {
    use rand::Rng;
    format!("{:06}", rand::thread_rng().gen_range(0..1_000_000))
}

/// Normalize a name into a URL slug: lowercase, ASCII alphanumerics kept,
/// every other run collapsed into a single `-`.
pub fn slugify(source: &str) -> String {
    let mut slug = String::with_capacity(source.len());
    let mut last_dash = true; // suppress leading dash
    for c in source.chars() {
        if c.is_ascii_alphanumeric() {
            slug.push(c.to_ascii_lowercase());
            last_dash = false;
        } else if !last_dash {
            slug.push('-');
            last_dash = true;
        }
    }
    while slug.ends_with('-') {
        slug.pop();
    }
    slug
}

/// Canonicalize a string→string option map for comparison: serialize with
/// keys sorted so the same selections always produce the same JSON text.
pub fn canonical_options(options: &std::collections::BTreeMap<String, String>) -> Option<String> {
    if options.is_empty() {
        None
    } else {
        serde_json::to_string(options).ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn slugify_basic() {
        assert_eq!(slugify("Blue Suede Shoes"), "blue-suede-shoes");
        assert_eq!(slugify("  Déjà  Vu!  "), "d-j-vu");
        assert_eq!(slugify("100% Cotton T-Shirt"), "100-cotton-t-shirt");
    }

    #[test]
    fn slugify_empty_and_symbols() {
        assert_eq!(slugify(""), "");
        assert_eq!(slugify("!!!"), "");
    }

    #[test]
    fn canonical_options_sorted() {
        let mut a = std::collections::BTreeMap::new();
        a.insert("size".to_string(), "M".to_string());
        a.insert("color".to_string(), "red".to_string());
        // BTreeMap iterates sorted, so insertion order cannot leak into the JSON
        assert_eq!(
            canonical_options(&a).unwrap(),
            r#"{"color":"red","size":"M"}"#
        );
        assert!(canonical_options(&std::collections::BTreeMap::new()).is_none());
    }

    #[test]
    fn snowflake_ids_fit_js_safe_integer() {
        for _ in 0..100 {
            let id = snowflake_id();
            assert!(id > 0);
            assert!(id <= 0x1F_FFFF_FFFF_FFFF); // 53 bits
        }
    }

    #[test]
    fn otp_is_six_digits() {
        let otp = random_otp();
        assert_eq!(otp.len(), 6);
        assert!(otp.chars().all(|c| c.is_ascii_digit()));
    }
}
