use prometheus::{IntCounter, IntCounterVec, Opts, Registry};
use std::sync::LazyLock;

pub static REGISTRY: LazyLock<Registry> = LazyLock::new(Registry::new);

pub static ACCESS_REQUESTS: LazyLock<IntCounterVec> = LazyLock::new(|| {
    IntCounterVec::new(
        Opts::new(
            "trackvault_access_requests_total",
            "Access requests by resource kind and outcome",
        ),
        &["kind", "outcome"],
    )
    .unwrap()
});

pub static CHALLENGES_ISSUED: LazyLock<IntCounter> = LazyLock::new(|| {
    IntCounter::new(
        "trackvault_challenges_issued_total",
        "Payment challenges returned to callers",
    )
    .unwrap()
});

pub static PAYMENTS_TOTAL: LazyLock<IntCounter> = LazyLock::new(|| {
    IntCounter::new(
        "trackvault_payments_total",
        "Verified payments recorded in the ledger",
    )
    .unwrap()
});

pub static PAYMENTS_FAILED: LazyLock<IntCounter> = LazyLock::new(|| {
    IntCounter::new(
        "trackvault_payments_failed_total",
        "Payment submissions that failed verification",
    )
    .unwrap()
});

pub static ENTITLEMENTS_CREATED: LazyLock<IntCounter> = LazyLock::new(|| {
    IntCounter::new(
        "trackvault_entitlements_created_total",
        "Entitlements created by verified payments",
    )
    .unwrap()
});

/// Register all metrics with the registry.
pub fn register_metrics() {
    REGISTRY
        .register(Box::new(ACCESS_REQUESTS.clone()))
        .unwrap();
    REGISTRY
        .register(Box::new(CHALLENGES_ISSUED.clone()))
        .unwrap();
    REGISTRY.register(Box::new(PAYMENTS_TOTAL.clone())).unwrap();
    REGISTRY
        .register(Box::new(PAYMENTS_FAILED.clone()))
        .unwrap();
    REGISTRY
        .register(Box::new(ENTITLEMENTS_CREATED.clone()))
        .unwrap();
}
