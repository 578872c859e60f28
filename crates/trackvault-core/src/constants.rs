/// Payment network identifier advertised in challenges.
pub const NETWORK: &str = "base";

/// Default settlement currency for priced resources.
pub const DEFAULT_CURRENCY: &str = "USDC";

/// Request header carrying the opaque payment proof (base64-encoded JSON).
pub const PAYMENT_HEADER: &str = "X-PAYMENT";

/// Response header carrying the settlement receipt after a paid grant.
pub const PAYMENT_RESPONSE_HEADER: &str = "X-Payment-Response";

/// Request header carrying the caller identity, injected by the upstream
/// authentication layer. Absent for anonymous requests.
pub const CALLER_HEADER: &str = "X-Caller-Id";

/// 402 mirror headers: the challenge fields duplicated into response metadata
/// for clients that read headers instead of the body.
pub const AMOUNT_HEADER: &str = "X-Payment-Amount";
pub const CURRENCY_HEADER: &str = "X-Payment-Currency";
pub const NETWORK_HEADER: &str = "X-Payment-Network";
pub const RECIPIENT_HEADER: &str = "X-Payment-Recipient";
