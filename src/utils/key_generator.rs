use rand::RngCore;
use rand::rngs::OsRng;

pub const CHEAT_KEY_PREFIX: &str = "NL-";

/// 生成作弊码: "NL-" + 16 位大写十六进制（8 字节系统随机数）
pub fn generate_cheat_key() -> String {
    let mut bytes = [0u8; 8];
    OsRng.fill_bytes(&mut bytes);
    format!("{CHEAT_KEY_PREFIX}{}", hex::encode_upper(bytes))
}
