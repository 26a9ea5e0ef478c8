pub mod field_codec;

pub use field_codec::{FieldCodec, FieldDecodeError, LegacyFieldPolicy};
