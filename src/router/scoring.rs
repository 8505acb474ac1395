//! Heuristic score adjustments layered on top of cosine similarity.
//!
//! The adjustments encode restaurant-domain knowledge for Vietnamese
//! utterances: an explicit tool name in the text, whether the text carries
//! a booking number, and which action verb it leads with.

use crate::types::ToolDefinition;

/// Weights and threshold used when scoring candidates.
///
/// ```rust
/// # use maitre::ScoringConfig;
/// let scoring = ScoringConfig::new().threshold(0.7).name_boost(0.05);
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct ScoringConfig {
    /// Minimum score for a match, before rounding. Default: 0.6.
    pub threshold: f64,
    /// Tool name appears verbatim in the utterance. Default: 0.1.
    pub name_boost: f64,
    /// Create-booking without a number, update-booking with one. Default: 0.2.
    pub directional_boost: f64,
    /// View, add and delete categories. Default: 0.1.
    pub category_boost: f64,
    /// Booking category, create tool. Default: 0.3.
    pub booking_create_boost: f64,
    /// Booking category, update tool with an update verb. Default: 0.2.
    pub booking_update_boost: f64,
    /// Cancel category. Default: 0.15.
    pub cancel_boost: f64,
}

impl Default for ScoringConfig {
    fn default() -> Self {
        Self {
            threshold: 0.6,
            name_boost: 0.1,
            directional_boost: 0.2,
            category_boost: 0.1,
            booking_create_boost: 0.3,
            booking_update_boost: 0.2,
            cancel_boost: 0.15,
        }
    }
}

impl ScoringConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn threshold(mut self, threshold: f64) -> Self {
        self.threshold = threshold;
        self
    }

    pub fn name_boost(mut self, boost: f64) -> Self {
        self.name_boost = boost;
        self
    }

    pub fn directional_boost(mut self, boost: f64) -> Self {
        self.directional_boost = boost;
        self
    }

    pub fn category_boost(mut self, boost: f64) -> Self {
        self.category_boost = boost;
        self
    }

    pub fn booking_boosts(mut self, create: f64, update: f64) -> Self {
        self.booking_create_boost = create;
        self.booking_update_boost = update;
        self
    }

    pub fn cancel_boost(mut self, boost: f64) -> Self {
        self.cancel_boost = boost;
        self
    }
}

const VIEW_KEYWORDS: &[&str] = &["xem", "hiển thị", "cho xem"];
const ADD_KEYWORDS: &[&str] = &["thêm", "tạo"];
const DELETE_KEYWORDS: &[&str] = &["xóa"];
const BOOKING_KEYWORDS: &[&str] = &["đặt bàn", "đặt"];
const CANCEL_KEYWORDS: &[&str] = &["hủy", "cancel"];
const UPDATE_VERBS: &[&str] = &["cập nhật", "thay đổi", "sửa", "update"];

const CREATE_BOOKING: &str = "create_booking";
const UPDATE_BOOKING: &str = "update_booking";

/// Action category an utterance leads with.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Category {
    View,
    Add,
    Delete,
    Booking,
    Cancel,
}

impl Category {
    /// First category, in precedence order, whose keywords occur in the
    /// lower-cased utterance.
    pub fn detect(utterance: &str) -> Option<Self> {
        let has = |words: &[&str]| words.iter().any(|w| utterance.contains(w));
        if has(VIEW_KEYWORDS) {
            Some(Category::View)
        } else if has(ADD_KEYWORDS) {
            Some(Category::Add)
        } else if has(DELETE_KEYWORDS) {
            Some(Category::Delete)
        } else if has(BOOKING_KEYWORDS) {
            Some(Category::Booking)
        } else if has(CANCEL_KEYWORDS) {
            Some(Category::Cancel)
        } else {
            None
        }
    }
}

/// Utterance features computed once per match.
#[derive(Debug, Clone)]
pub struct Utterance {
    lower: String,
    has_digit: bool,
    category: Option<Category>,
    has_update_verb: bool,
}

impl Utterance {
    pub fn new(text: &str) -> Self {
        let lower = text.to_lowercase();
        Self {
            has_digit: text.chars().any(|c| c.is_ascii_digit()),
            category: Category::detect(&lower),
            has_update_verb: UPDATE_VERBS.iter().any(|w| lower.contains(w)),
            lower,
        }
    }

    pub fn category(&self) -> Option<Category> {
        self.category
    }

    pub fn has_digit(&self) -> bool {
        self.has_digit
    }
}

/// Total heuristic boost for `tool` given the utterance features.
pub fn boost(config: &ScoringConfig, utterance: &Utterance, tool: &ToolDefinition) -> f64 {
    let name = tool.name.to_lowercase();
    let description = tool.description.to_lowercase();
    let mut total = 0.0;

    if utterance.lower.contains(&name) {
        total += config.name_boost;
    }

    if name.contains("booking") {
        if name.contains(CREATE_BOOKING) {
            if !utterance.has_digit {
                total += config.directional_boost;
            }
        } else if name.contains(UPDATE_BOOKING) && utterance.has_digit {
            total += config.directional_boost;
        }
    }

    total += match utterance.category {
        Some(Category::View) if name.contains("show") || description.contains("hiển thị") => {
            config.category_boost
        }
        Some(Category::Add) if name.contains("add") || description.contains("thêm") => {
            config.category_boost
        }
        Some(Category::Delete) if name.contains("delete") || description.contains("xóa") => {
            config.category_boost
        }
        Some(Category::Booking) if name.contains(CREATE_BOOKING) => config.booking_create_boost,
        Some(Category::Booking) if name.contains(UPDATE_BOOKING) && utterance.has_update_verb => {
            config.booking_update_boost
        }
        Some(Category::Cancel) if name.contains("cancel") || description.contains("hủy") => {
            config.cancel_boost
        }
        _ => 0.0,
    };

    total
}

/// Round to three decimals, the precision confidences are reported at.
pub fn round3(score: f64) -> f64 {
    (score * 1000.0).round() / 1000.0
}
