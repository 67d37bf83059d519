use base64::{engine::general_purpose::STANDARD, Engine as _};

/// Standard alphabet, padded, no line breaks.
pub fn encode(bytes: &[u8]) -> String {
    STANDARD.encode(bytes)
}

pub fn data_uri(mime_type: &str, base64_data: &str) -> String {
    format!("data:{};base64,{}", mime_type, base64_data)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encode_round_trips() {
        let samples: [&[u8]; 4] = [b"a", b"menu", &[0xff, 0xd8, 0xff, 0xe0, 0x00], &[7u8; 1000]];
        for bytes in samples {
            let encoded = encode(bytes);
            assert!(!encoded.contains('\n'));
            assert_eq!(STANDARD.decode(&encoded).unwrap(), bytes);
        }
    }

    #[test]
    fn test_empty_input() {
        assert_eq!(encode(&[]), "");
    }

    #[test]
    fn test_data_uri() {
        assert_eq!(
            data_uri("image/jpeg", &encode(b"hi")),
            "data:image/jpeg;base64,aGk="
        );
    }
}
