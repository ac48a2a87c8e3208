/// Quantity threshold below which a position is treated as closed
pub const QUANTITY_THRESHOLD: &str = "0.00000001";

/// Decimal precision for derived ratios (returns, allocation fractions)
pub const DECIMAL_PRECISION: u32 = 6;

/// Default settlement (sweep) fund symbol
pub const DEFAULT_SETTLEMENT_SYMBOL: &str = "VMFXX";
