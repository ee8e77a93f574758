//! Protocol Constants
//!
//! Fixed-point scales, asset resolutions, and the module-wide defaults used
//! when a vault carries no quoting override.

/// Fixed-point scales
pub mod precision {
    /// Parts-per-million scale (1_000_000 = 1.0)
    pub const ONE_MILLION: u32 = 1_000_000;

    /// One million squared, used when two ppm values are multiplied
    pub const ONE_TRILLION: u64 = 1_000_000_000_000;
}

/// Asset resolutions
pub mod assets {
    /// Atomic resolution of the quote asset (USDC has 6 decimals)
    pub const QUOTE_ATOMIC_RESOLUTION: i32 = -6;
}

/// Default quoting parameters applied to every vault without an override
pub mod quoting {
    /// Number of price layers on each side of the book
    pub const DEFAULT_LAYERS: u32 = 2;

    /// Minimum spread (1%)
    pub const DEFAULT_SPREAD_MIN_PPM: u32 = 10_000;

    /// Buffer added on top of the market's minimum price change (0.15%)
    pub const DEFAULT_SPREAD_BUFFER_PPM: u32 = 1_500;

    /// Skew factor (2.0)
    pub const DEFAULT_SKEW_FACTOR_PPM: u32 = 2_000_000;

    /// Order size as a share of vault equity (10%)
    pub const DEFAULT_ORDER_SIZE_PCT_PPM: u32 = 100_000;

    /// Lifetime of every placed order
    pub const DEFAULT_ORDER_EXPIRATION_SECONDS: u32 = 60;

    /// Equity a flat vault needs before it starts quoting (1,000 USDC)
    pub const DEFAULT_ACTIVATION_THRESHOLD_QUOTE_QUANTUMS: u64 = 1_000_000_000;

    /// Layer index must fit in the 8 client id bits reserved for it
    pub const MAX_LAYERS: u32 = u8::MAX as u32;

    /// Upper bound (exclusive) on `skew_factor_ppm * order_size_pct_ppm`
    pub const MAX_SKEW_TIMES_ORDER_SIZE_PPM2: u64 = 2_000_000_000_000;
}

/// Client id layout for vault orders
pub mod client_ids {
    /// Bit holding the order side (1 = sell)
    pub const SIDE_SHIFT: u32 = 31;

    /// First bit of the 8-bit layer index
    pub const LAYER_SHIFT: u32 = 23;

    /// Bit flipped on every cancel-and-replace
    pub const REPLACEMENT_BIT: u32 = 1;
}

/// Share ledger configuration
pub mod shares {
    /// Blocks a fresh megavault deposit stays locked (30 days at one block per second)
    pub const DEFAULT_SHARE_LOCK_BLOCKS: u32 = 2_592_000;
}

/// Seeds for deterministic module addresses
pub mod addresses {
    /// Seed of the megavault main pool account
    pub const MEGAVAULT_SEED: &str = "megavault";

    /// Prefix of every sub-vault account seed
    pub const VAULT_SEED_PREFIX: &str = "vault";
}
