// src/utils/precision.rs
use rust_decimal::Decimal;

/// Rounds a quantity DOWN to the nearest multiple of the market's step
/// size. Rounding down never overdraws the balance.
/// Example: qty=10.999, step=1.0 -> 10.0
pub fn normalize_quantity(quantity: Decimal, step_size: Decimal) -> Decimal {
    if step_size.is_zero() {
        return quantity;
    }
    (quantity / step_size).floor() * step_size
}

/// Rounds a price to the NEAREST multiple of the market's tick size.
/// Example: price=100.16, tick=0.1 -> 100.2
pub fn normalize_price(price: Decimal, tick_size: Decimal) -> Decimal {
    if tick_size.is_zero() {
        return price;
    }
    (price / tick_size).round() * tick_size
}
