//! Maps raw transaction labels to the closed [`BudgetCategory`] set.
//!
//! Ordered rule matching: exact raw-category aliases first, then
//! case-insensitive keyword search over merchant and notes, category by
//! category in canonical order, falling back to miscellaneous. Total — every
//! input maps to some category.

use crate::models::BudgetCategory;

/// Raw category strings that resolve directly, before any keyword matching.
const CATEGORY_ALIASES: &[(&str, BudgetCategory)] = &[
    ("food", BudgetCategory::Food),
    ("fuel", BudgetCategory::Fuel),
    ("petrol", BudgetCategory::Fuel),
    ("diesel", BudgetCategory::Fuel),
    ("transport", BudgetCategory::Transport),
    ("travel", BudgetCategory::Transport),
    ("recharge", BudgetCategory::Recharge),
    ("entertainment", BudgetCategory::Entertainment),
    ("medical", BudgetCategory::Medical),
    ("health", BudgetCategory::Medical),
    ("send_home", BudgetCategory::SendHome),
    ("family", BudgetCategory::SendHome),
    ("miscellaneous", BudgetCategory::Miscellaneous),
];

/// Merchant/notes keywords per category, checked in canonical category order.
fn keywords(category: BudgetCategory) -> &'static [&'static str] {
    match category {
        BudgetCategory::Food => &[
            "swiggy", "zomato", "restaurant", "dhaba", "tiffin", "canteen", "chai", "tea",
            "breakfast", "lunch", "dinner", "grocery", "kirana", "mess",
        ],
        BudgetCategory::Fuel => &[
            "petrol", "diesel", "fuel", "indian oil", "iocl", "hp petrol", "hpcl",
            "bharat petroleum", "bpcl", "shell", "pump", "cng",
        ],
        BudgetCategory::Transport => &[
            "ola", "uber", "rapido", "metro", "bus", "auto", "rickshaw", "train", "irctc",
            "toll", "fastag", "parking",
        ],
        BudgetCategory::Recharge => &[
            "jio", "airtel", "vodafone", "vi ", "bsnl", "recharge", "dth", "data pack",
            "prepaid", "postpaid",
        ],
        BudgetCategory::Entertainment => &[
            "netflix", "hotstar", "prime video", "spotify", "movie", "cinema", "pvr", "inox",
            "bookmyshow", "game",
        ],
        BudgetCategory::Medical => &[
            "pharmacy", "chemist", "apollo", "medplus", "1mg", "pharmeasy", "hospital",
            "clinic", "doctor", "medicine", "lab test",
        ],
        BudgetCategory::SendHome => &[
            "send home", "sent home", "home transfer", "family transfer", "money to family",
            "remit",
        ],
        BudgetCategory::Miscellaneous => &[],
    }
}

/// Classifies a transaction into exactly one budget category. Never fails;
/// anything unrecognized lands in miscellaneous.
pub fn map_budget_category(raw_category: &str, merchant: &str, notes: &str) -> BudgetCategory {
    let raw = raw_category.trim().to_lowercase();
    for (alias, category) in CATEGORY_ALIASES {
        if raw == *alias {
            return *category;
        }
    }

    let haystack = format!("{} {}", merchant, notes).to_lowercase();
    for category in BudgetCategory::ALL {
        for keyword in keywords(category) {
            if haystack.contains(keyword) {
                return category;
            }
        }
    }

    BudgetCategory::Miscellaneous
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exact_raw_category_wins() {
        assert_eq!(map_budget_category("fuel", "", ""), BudgetCategory::Fuel);
        assert_eq!(map_budget_category("food", "", ""), BudgetCategory::Food);
        assert_eq!(
            map_budget_category("send_home", "", ""),
            BudgetCategory::SendHome
        );
    }

    #[test]
    fn test_raw_category_aliases() {
        assert_eq!(map_budget_category("petrol", "", ""), BudgetCategory::Fuel);
        assert_eq!(
            map_budget_category("travel", "", ""),
            BudgetCategory::Transport
        );
        assert_eq!(
            map_budget_category("health", "", ""),
            BudgetCategory::Medical
        );
    }

    #[test]
    fn test_raw_category_is_case_insensitive_and_trimmed() {
        assert_eq!(
            map_budget_category("  FUEL ", "", ""),
            BudgetCategory::Fuel
        );
    }

    #[test]
    fn test_exact_category_takes_precedence_over_keywords() {
        // Raw category says fuel even though the merchant looks like food.
        assert_eq!(
            map_budget_category("fuel", "Swiggy", ""),
            BudgetCategory::Fuel
        );
    }

    #[test]
    fn test_merchant_keywords() {
        assert_eq!(
            map_budget_category("other", "Zomato Order", ""),
            BudgetCategory::Food
        );
        assert_eq!(
            map_budget_category("other", "OLA CABS", ""),
            BudgetCategory::Transport
        );
        assert_eq!(
            map_budget_category("other", "Jio Prepaid", ""),
            BudgetCategory::Recharge
        );
    }

    #[test]
    fn test_notes_keywords() {
        assert_eq!(
            map_budget_category("other", "", "monthly netflix subscription"),
            BudgetCategory::Entertainment
        );
        assert_eq!(
            map_budget_category("other", "", "sent home for diwali"),
            BudgetCategory::SendHome
        );
    }

    #[test]
    fn test_unmatched_falls_back_to_miscellaneous() {
        assert_eq!(
            map_budget_category("gig_payout", "Unknown Shop", "no hints here"),
            BudgetCategory::Miscellaneous
        );
        assert_eq!(map_budget_category("", "", ""), BudgetCategory::Miscellaneous);
    }
}
