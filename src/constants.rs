/// Sentinel and default values shared across normalization, scoring and display

/// Display value for any number that cannot be computed (missing input, zero divisor)
pub const NOT_AVAILABLE: &str = "N/A";

/// Display value for a property with no usable price from either source
pub const PRICE_UNAVAILABLE: &str = "Price not available";

/// Image shown when neither source carries a photo
pub const PLACEHOLDER_IMAGE: &str = "/placeholder-property.jpg";

/// Neutral score used when a score has no inputs at all
pub const NEUTRAL_SCORE: f64 = 5.0;

/// Inclusive bounds for every derived score
pub const SCORE_MIN: f64 = 0.0;
pub const SCORE_MAX: f64 = 10.0;

// Source names used in logs, metrics and fetch errors
pub const SOURCE_PROPERTY_DETAIL: &str = "property_detail";
pub const SOURCE_MLS: &str = "mls";

/// MLS statuses that mean the listing has closed
pub const CLOSED_STATUSES: &[&str] = &["closed", "sold"];

/// MLS statuses that mean an offer has been accepted
pub const PENDING_STATUSES: &[&str] = &["pending", "under contract", "active under contract", "contingent"];
