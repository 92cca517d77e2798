pub mod binary;
pub mod integer;
pub mod string;
pub mod variable_int;

pub use binary::{binary_len, decode_binary, encode_binary};
pub use integer::{decode_u16, decode_u32, decode_u8};
pub use string::{decode_string, encode_string, string_len};
pub use variable_int::{
    decode_variable_int, encode_variable_int, read_variable_int, variable_int_len, VariableInt,
    VARIABLE_INT_MAX,
};
