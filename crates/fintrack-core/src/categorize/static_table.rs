//! Built-in raw category -> app category table
//!
//! Seed/default mapping for bank category codes. The admin-curated
//! `category_mappings` table can override it per code.

use tracing::warn;

use super::DEFAULT_CATEGORY;

/// Raw category code -> app category, in lookup order
///
/// Order matters: substring fallback returns the first entry that matches.
pub const CATEGORY_TABLE: &[(&str, &str)] = &[
    // Income
    ("INCOME", "Paycheck"),
    ("TRANSFER_IN", "Paycheck"),
    ("PAYROLL", "Paycheck"),
    ("INTEREST", "Interest"),
    ("DIVIDEND", "Interest"),
    ("BUSINESS_INCOME", "Business Income"),
    ("RENTAL_INCOME", "Business Income"),
    ("INVESTMENT_INCOME", "Interest"),
    ("OTHER_INCOME", "Other Income"),
    // Food & dining
    ("FOOD_AND_DRINK", "Groceries"),
    ("RESTAURANTS", "Restaurants & Bars"),
    ("FAST_FOOD", "Restaurants & Bars"),
    ("COFFEE_SHOP", "Coffee Shops"),
    ("GROCERIES", "Groceries"),
    ("FOOD_DELIVERY", "Restaurants & Bars"),
    ("ALCOHOL_AND_BARS", "Restaurants & Bars"),
    // Shopping
    ("SHOPPING", "Shopping"),
    ("ONLINE_SHOPPING", "Shopping"),
    ("CLOTHING_AND_ACCESSORIES", "Clothing"),
    ("ELECTRONICS", "Electronics"),
    ("HOME_AND_GARDEN", "Furniture & Housewares"),
    ("FURNITURE", "Furniture & Housewares"),
    ("BOOKS_AND_MEDIA", "Shopping"),
    ("SPORTING_GOODS", "Shopping"),
    ("JEWELRY_AND_WATCHES", "Shopping"),
    ("BEAUTY_AND_COSMETICS", "Shopping"),
    // Auto & transport
    ("AUTO_AND_TRANSPORT", "Auto Payment"),
    ("GAS_STATIONS", "Gas"),
    ("PUBLIC_TRANSPORTATION", "Public Transit"),
    ("TAXI", "Taxi & Ride Shares"),
    ("RIDE_SHARE", "Taxi & Ride Shares"),
    ("PARKING", "Parking & Tolls"),
    ("TOLLS", "Parking & Tolls"),
    ("AUTO_MAINTENANCE", "Auto Maintenance"),
    ("AUTO_INSURANCE", "Auto Payment"),
    // Housing
    ("HOME_IMPROVEMENT", "Home Improvement"),
    ("MORTGAGE", "Mortgage"),
    ("RENT_AND_UTILITIES", "Rent"),
    ("REAL_ESTATE", "Home Improvement"),
    ("HOME_SERVICES", "Home Improvement"),
    // Bills & utilities
    ("BILLS_AND_UTILITIES", "Gas & Electric"),
    ("UTILITIES", "Gas & Electric"),
    ("INTERNET_AND_CABLE", "Internet & Cable"),
    ("PHONE", "Phone"),
    ("WATER", "Water"),
    ("GARBAGE", "Garbage"),
    ("ELECTRICITY", "Gas & Electric"),
    ("GAS", "Gas & Electric"),
    // Travel & lifestyle
    ("TRAVEL", "Travel & Vacation"),
    ("HOTELS_AND_ACCOMMODATION", "Travel & Vacation"),
    ("AIR_TRAVEL", "Travel & Vacation"),
    ("ENTERTAINMENT", "Entertainment & Recreation"),
    ("MOVIES_AND_TV", "Entertainment & Recreation"),
    ("MUSIC", "Entertainment & Recreation"),
    ("GAMING", "Entertainment & Recreation"),
    ("SPORTS", "Entertainment & Recreation"),
    ("FITNESS", "Fitness"),
    ("PETS", "Pets"),
    ("PERSONAL_CARE", "Personal"),
    // Health
    ("MEDICAL", "Medical"),
    ("HEALTHCARE", "Medical"),
    ("DENTIST", "Dentist"),
    ("PHARMACY", "Medical"),
    ("VETERINARY", "Pets"),
    // Financial
    ("LOAN_PAYMENT", "Loan Repayment"),
    ("CREDIT_CARD_PAYMENT", "Credit Card Payment"),
    ("STUDENT_LOAN", "Student Loans"),
    ("INSURANCE", "Insurance"),
    ("BANK_FEES", "Financial Fees"),
    ("ATM_FEES", "Financial Fees"),
    ("OVERDRAFT_FEES", "Financial Fees"),
    ("TAXES", "Taxes"),
    ("LEGAL_SERVICES", "Financial & Legal Services"),
    // Education
    ("EDUCATION", "Education"),
    ("TUITION", "Education"),
    ("STUDENT_LOAN_PAYMENT", "Student Loans"),
    // Children
    ("CHILD_CARE", "Child Care"),
    ("CHILD_ACTIVITIES", "Child Activities"),
    // Gifts & donations
    ("GIFTS", "Gifts"),
    ("CHARITY", "Charity"),
    ("DONATIONS", "Charity"),
    // Business
    ("BUSINESS_SERVICES", "Financial & Legal Services"),
    ("ADVERTISING", "Advertising & Promotion"),
    ("OFFICE_SUPPLIES", "Office Supplies & Expenses"),
    ("BUSINESS_TRAVEL", "Business Travel & Meals"),
    ("BUSINESS_MEALS", "Business Travel & Meals"),
    ("BUSINESS_AUTO", "Business Auto Expenses"),
    ("BUSINESS_INSURANCE", "Business Insurance"),
    ("BUSINESS_UTILITIES", "Business Utilities & Communication"),
    ("EMPLOYEE_WAGES", "Employee Wages & Contract Labor"),
    ("CONTRACT_LABOR", "Employee Wages & Contract Labor"),
    ("OFFICE_RENT", "Office Rent"),
    ("POSTAGE_AND_SHIPPING", "Postage & Shipping"),
    // Transfers
    ("TRANSFER", "Transfer"),
    ("TRANSFER_OUT", "Transfer"),
    ("BALANCE_TRANSFER", "Balance Adjustments"),
    // Cash & ATM
    ("CASH_AND_ATM", "Cash & ATM"),
    ("ATM_WITHDRAWAL", "Cash & ATM"),
    ("CASH_ADVANCE", "Cash & ATM"),
    // Miscellaneous
    ("MISCELLANEOUS", "Miscellaneous"),
    ("UNCATEGORIZED", "Uncategorized"),
    ("CHECK", "Check"),
    ("DEPOSIT", "Paycheck"),
    ("WITHDRAWAL", "Cash & ATM"),
    ("PAYMENT", "Miscellaneous"),
    ("SERVICE", "Miscellaneous"),
    ("SUBSCRIPTION", "Miscellaneous"),
    ("MEMBERSHIP", "Miscellaneous"),
    ("LICENSE", "Miscellaneous"),
    ("FINE", "Miscellaneous"),
    ("PENALTY", "Miscellaneous"),
    ("FEE", "Financial Fees"),
    ("COMMISSION", "Miscellaneous"),
    ("REFUND", "Miscellaneous"),
    ("REIMBURSEMENT", "Miscellaneous"),
    ("ADJUSTMENT", "Balance Adjustments"),
    ("CORRECTION", "Balance Adjustments"),
    ("ERROR", "Miscellaneous"),
    ("UNKNOWN", "Uncategorized"),
];

/// Look up a raw category code, returning `None` when nothing matches
///
/// Exact key first, then the first entry where either string contains the other.
pub fn lookup_raw_category(raw_category: &str) -> Option<&'static str> {
    let upper = raw_category.trim().to_uppercase();
    if upper.is_empty() {
        return None;
    }

    if let Some((_, app)) = CATEGORY_TABLE.iter().find(|(key, _)| *key == upper) {
        return Some(app);
    }

    CATEGORY_TABLE
        .iter()
        .find(|(key, _)| upper.contains(key) || key.contains(upper.as_str()))
        .map(|(_, app)| *app)
}

/// Map a raw category code to an app category, defaulting to "Miscellaneous"
pub fn resolve_raw_category(raw_category: &str) -> &'static str {
    match lookup_raw_category(raw_category) {
        Some(app) => app,
        None => {
            warn!(
                raw_category,
                default = DEFAULT_CATEGORY,
                "No mapping found for raw category, using default"
            );
            DEFAULT_CATEGORY
        }
    }
}

/// All distinct app categories the table can produce, in first-seen order
pub fn app_categories() -> Vec<&'static str> {
    let mut seen = Vec::new();
    for (_, app) in CATEGORY_TABLE {
        if !seen.contains(app) {
            seen.push(*app);
        }
    }
    seen
}

/// Raw category codes that map to `app_category`
pub fn raw_categories_for(app_category: &str) -> Vec<&'static str> {
    CATEGORY_TABLE
        .iter()
        .filter(|(_, app)| *app == app_category)
        .map(|(key, _)| *key)
        .collect()
}
