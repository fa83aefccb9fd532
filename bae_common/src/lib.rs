mod money;

pub mod op;

pub use money::{is_three_decimal_currency, Money, MoneyConversionError, DEFAULT_CURRENCY, PLATFORM_FEE_BPS};
