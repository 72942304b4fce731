/// Static thresholds driving the health score, insights and savings estimates.
#[derive(Debug, Clone, PartialEq)]
pub struct HealthThresholds {
    /// More active subscriptions than this costs `high_count_penalty`
    pub high_count: usize,
    pub high_count_penalty: i32,
    /// Otherwise, more than this costs `moderate_count_penalty`
    pub moderate_count: usize,
    pub moderate_count_penalty: i32,

    /// Monthly spend above this costs `high_cost_penalty`
    pub high_monthly_cost: f64,
    pub high_cost_penalty: i32,
    /// Otherwise, spend above this costs `moderate_cost_penalty`
    pub moderate_monthly_cost: f64,
    pub moderate_cost_penalty: i32,

    /// Usage below this percentage marks a non-essential record as unused
    pub unused_usage_pct: f64,

    /// Assumed saving when moving a monthly plan to annual billing
    pub annual_discount_rate: f64,

    /// Categories with at least this many active records are bundling candidates
    pub bundle_min_services: usize,
    pub bundle_discount_rate: f64,

    /// User budget from preferences; `None` disables the over-budget insight
    pub monthly_budget: Option<f64>,
}

impl Default for HealthThresholds {
    fn default() -> Self {
        Self {
            high_count: 10,
            high_count_penalty: 20,
            moderate_count: 5,
            moderate_count_penalty: 10,
            high_monthly_cost: 200.0,
            high_cost_penalty: 25,
            moderate_monthly_cost: 100.0,
            moderate_cost_penalty: 15,
            unused_usage_pct: 20.0,
            annual_discount_rate: 0.15,
            bundle_min_services: 3,
            bundle_discount_rate: 0.10,
            monthly_budget: None,
        }
    }
}

impl HealthThresholds {
    pub fn with_monthly_budget(mut self, budget: Option<f64>) -> Self {
        self.monthly_budget = budget;
        self
    }
}
