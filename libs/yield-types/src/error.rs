/// Failure modes of the pricing engine
///
/// Every error is returned synchronously to the immediate caller; the
/// engine never clamps or truncates a value that would misprice a trade.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MathError {
    /// An intermediate fixed-point product or power left the representable range
    Overflow,
    /// A divide received a zero divisor (e.g. a zero reserve)
    DivisionByZero,
    /// The decayed time exponent pushed `1 - t` (or `1 - t*g`) outside (0, 1]
    ExponentOutOfRange,
    /// The trade would leave one reserve non-positive
    InsufficientReserves,
}
