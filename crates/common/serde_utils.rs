use serde::{Deserialize, Deserializer, Serializer, de::Error};

pub mod u256 {
    use super::*;
    use ethereum_types::U256;

    pub fn deser_hex_str<'de, D>(d: D) -> Result<U256, D::Error>
    where
        D: Deserializer<'de>,
    {
        let value = String::deserialize(d)?;
        let hex = value
            .strip_prefix("0x")
            .ok_or_else(|| D::Error::custom("Failed to deserialize u256 value"))?;
        U256::from_str_radix(hex, 16)
            .map_err(|_| D::Error::custom("Failed to deserialize u256 value"))
    }

    pub fn deser_hex_or_dec_str<'de, D>(d: D) -> Result<U256, D::Error>
    where
        D: Deserializer<'de>,
    {
        let value = String::deserialize(d)?;
        parse_hex_or_dec(&value).map_err(D::Error::custom)
    }

    pub fn parse_hex_or_dec(value: &str) -> Result<U256, String> {
        if let Some(hex) = value.strip_prefix("0x") {
            if hex.is_empty() {
                return Ok(U256::zero());
            }
            U256::from_str_radix(hex, 16).map_err(|_| format!("Invalid hex quantity {value}"))
        } else {
            U256::from_dec_str(value).map_err(|e| e.to_string())
        }
    }

    pub mod hex_str {
        use super::*;

        pub fn serialize<S>(value: &U256, serializer: S) -> Result<S::Ok, S::Error>
        where
            S: Serializer,
        {
            serializer.serialize_str(&format!("{value:#x}"))
        }

        pub fn deserialize<'de, D>(d: D) -> Result<U256, D::Error>
        where
            D: Deserializer<'de>,
        {
            super::deser_hex_str(d)
        }
    }

    pub mod hex_str_opt {
        use serde::Serialize;

        use super::*;

        pub fn serialize<S>(value: &Option<U256>, serializer: S) -> Result<S::Ok, S::Error>
        where
            S: Serializer,
        {
            Option::<String>::serialize(&value.map(|v| format!("{v:#x}")), serializer)
        }

        pub fn deserialize<'de, D>(d: D) -> Result<Option<U256>, D::Error>
        where
            D: Deserializer<'de>,
        {
            let value = Option::<String>::deserialize(d)?;
            match value {
                Some(s) if !s.is_empty() => parse_hex_or_dec(&s).map(Some).map_err(D::Error::custom),
                _ => Ok(None),
            }
        }
    }

    /// Storage maps in genesis files use short quantities as keys (`"0x01"`),
    /// keys are widened to 32 bytes here.
    pub mod storage_map {
        use super::*;
        use ethereum_types::H256;
        use std::collections::BTreeMap;

        pub fn deserialize<'de, D>(deserializer: D) -> Result<BTreeMap<H256, U256>, D::Error>
        where
            D: Deserializer<'de>,
        {
            let raw_map = BTreeMap::<String, String>::deserialize(deserializer)?;
            raw_map
                .into_iter()
                .map(|(k, v)| {
                    let key = parse_hex_or_dec(&k).map_err(D::Error::custom)?;
                    let value = parse_hex_or_dec(&v).map_err(D::Error::custom)?;
                    Ok((H256(key.to_big_endian()), value))
                })
                .collect()
        }

        pub fn serialize<S>(value: &BTreeMap<H256, U256>, serializer: S) -> Result<S::Ok, S::Error>
        where
            S: Serializer,
        {
            use serde::ser::SerializeMap;
            let mut map = serializer.serialize_map(Some(value.len()))?;
            for (k, v) in value {
                map.serialize_entry(&format!("{k:#x}"), &format!("{v:#x}"))?;
            }
            map.end()
        }
    }
}

pub mod u64 {
    use super::*;

    pub mod hex_str {
        use super::*;

        pub fn deserialize<'de, D>(d: D) -> Result<u64, D::Error>
        where
            D: Deserializer<'de>,
        {
            let value = String::deserialize(d)?;
            super::parse_hex_or_dec(&value).map_err(D::Error::custom)
        }

        pub fn serialize<S>(value: &u64, serializer: S) -> Result<S::Ok, S::Error>
        where
            S: Serializer,
        {
            serializer.serialize_str(&format!("{value:#x}"))
        }
    }

    pub mod hex_str_opt {
        use serde::Serialize;

        use super::*;

        pub fn serialize<S>(value: &Option<u64>, serializer: S) -> Result<S::Ok, S::Error>
        where
            S: Serializer,
        {
            Option::<String>::serialize(&value.map(|v| format!("{v:#x}")), serializer)
        }

        pub fn deserialize<'de, D>(d: D) -> Result<Option<u64>, D::Error>
        where
            D: Deserializer<'de>,
        {
            let value = Option::<String>::deserialize(d)?;
            match value {
                Some(s) if !s.is_empty() => super::parse_hex_or_dec(&s)
                    .map(Some)
                    .map_err(D::Error::custom),
                _ => Ok(None),
            }
        }
    }

    pub fn deser_hex_or_dec_str<'de, D>(d: D) -> Result<u64, D::Error>
    where
        D: Deserializer<'de>,
    {
        let value = String::deserialize(d)?;
        parse_hex_or_dec(&value).map_err(D::Error::custom)
    }

    /// Same rule as [`super::u256::parse_hex_or_dec`]: a single `0x` prefix means hex,
    /// anything else is read as decimal.
    pub fn parse_hex_or_dec(value: &str) -> Result<u64, String> {
        match value.strip_prefix("0x") {
            Some("") => Ok(0),
            Some(hex) => {
                u64::from_str_radix(hex, 16).map_err(|_| format!("Invalid hex quantity {value}"))
            }
            None => value
                .parse()
                .map_err(|_| format!("Invalid decimal quantity {value}")),
        }
    }
}

pub mod bytes {
    use ::bytes::Bytes;

    use super::*;

    pub fn deserialize<'de, D>(d: D) -> Result<Bytes, D::Error>
    where
        D: Deserializer<'de>,
    {
        let value = String::deserialize(d)?;
        let bytes = hex::decode(value.strip_prefix("0x").unwrap_or(&value))
            .map_err(|e| D::Error::custom(e.to_string()))?;
        Ok(Bytes::from(bytes))
    }

    pub fn serialize<S>(value: &Bytes, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&format!("0x{value:x}"))
    }

    pub mod opt {
        use super::*;

        pub fn deserialize<'de, D>(d: D) -> Result<Option<Bytes>, D::Error>
        where
            D: Deserializer<'de>,
        {
            let Some(value) = Option::<String>::deserialize(d)? else {
                return Ok(None);
            };
            let bytes = hex::decode(value.strip_prefix("0x").unwrap_or(&value))
                .map_err(|e| D::Error::custom(e.to_string()))?;
            Ok(Some(Bytes::from(bytes)))
        }
    }
}
