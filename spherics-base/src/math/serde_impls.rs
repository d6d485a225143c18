use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::math::{PositiveSign, ZeroOne};

macro_rules! serde_as_f64 {
    ($ty:ty) => {
        impl Serialize for $ty {
            fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
                self.into_inner().serialize(serializer)
            }
        }

        impl<'de> Deserialize<'de> for $ty {
            fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
                <$ty>::try_from(f64::deserialize(deserializer)?).map_err(serde::de::Error::custom)
            }
        }
    };
}

serde_as_f64!(PositiveSign);
serde_as_f64!(ZeroOne);
