//! The force-plot feature list. Shared with the `generate_sample` binary.

/// Test-SHAP columns fed into the force plot, in display order.
///
/// Hand-maintained to match the upstream model; checked against the test
/// SHAP table when it is loaded.
pub const FORCE_PLOT_FEATURES: &[&str] = &[
    "store_nbr_shap",
    "family_shap",
    "sales_by_store_nbr",
    "sales_by_family",
    "onpromotion",
    "year",
    "month",
    "day",
    "weekday",
    "sales_by_store_nbr_family",
    "rolling_mean_3",
    "rolling_mean_7",
    "rolling_mean_30",
    "sales_by_type",
    "sales_by_cluster",
    "dcoilwtico",
    "oil_mean_30",
    "oil_mean_90",
];
