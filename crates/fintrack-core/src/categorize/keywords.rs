//! Keyword fallback matcher for merchant names

use super::DEFAULT_CATEGORY;

/// (keywords, app category) rules, evaluated in order
pub const KEYWORD_RULES: &[(&[&str], &str)] = &[
    // Food & dining
    (&["UBER", "UBEREATS", "DOORDASH", "GRUBHUB"], "Restaurants & Bars"),
    (&["COSTCO", "WALMART", "SUPERMARKET", "GROCERY"], "Groceries"),
    (&["STARBUCKS", "TIM HORTONS", "COFFEE"], "Coffee Shops"),
    // Utilities
    (&["BELL", "ROGERS", "TELUS", "VERIZON"], "Phone"),
    (&["HYDRO", "ELECTRICITY"], "Gas & Electric"),
    // Transportation
    (&["ESSO", "PETRO-CANADA", "SHELL", "GAS"], "Gas"),
    (&["STM", "TRANSIT"], "Public Transit"),
    // Shopping
    (&["HOME DEPOT", "RONA", "LOWES"], "Home Improvement"),
    (&["IKEA"], "Furniture & Housewares"),
    (&["ZARA", "OLD NAVY", "H&M"], "Clothing"),
    // Medical
    (&["JEAN COUTU", "SHOPPERS", "PHARMACY", "CLINIC"], "Medical"),
    // Travel
    (&["BOOKING.COM", "HOTEL", "AIRLINE"], "Travel & Vacation"),
    // Financial
    (&["INTEREST PAID"], "Interest"),
    (&["CREDIT CARD PAYMENT", "PAYMENT - THANK YOU"], "Credit Card Payment"),
    (
        &["INTERAC E-TRANSFER", "EFT WITHDRAWAL", "EFT DEPOSIT"],
        "Transfer",
    ),
];

/// First keyword rule whose keywords appear in `merchant_name`
pub fn match_keywords(merchant_name: &str) -> Option<&'static str> {
    let upper = merchant_name.to_uppercase();
    KEYWORD_RULES
        .iter()
        .find(|(keywords, _)| keywords.iter().any(|k| upper.contains(k)))
        .map(|(_, category)| *category)
}

/// Keyword match with the "Miscellaneous" default
pub fn resolve_merchant_keywords(merchant_name: &str) -> &'static str {
    match_keywords(merchant_name).unwrap_or(DEFAULT_CATEGORY)
}
