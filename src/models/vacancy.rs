use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Posting dates are stored as `dd-mm-yyyy` strings.
const DATE_POSTED_FORMAT: &str = "%d-%m-%Y";

/// A job listing on the vacancy board.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Vacancy {
    pub id: i64,
    pub title: String,
    #[serde(default)]
    pub company: String,
    pub location: String,
    /// Salary as displayed, e.g. "₹6,000 - ₹9,000" or "Negotiable".
    pub salary: String,
    pub description: String,
    pub date_posted: String,
    pub contact: String,
    /// Numeric upper bound of the salary for sorting; 0 for "Negotiable".
    #[serde(default)]
    pub salary_value: i64,
}

impl Vacancy {
    pub fn posted_on(&self) -> Option<NaiveDate> {
        NaiveDate::parse_from_str(&self.date_posted, DATE_POSTED_FORMAT).ok()
    }

    /// Case-insensitive match against title, company, and location.
    pub fn matches(&self, query: &str) -> bool {
        if query.is_empty() {
            return true;
        }
        let query = query.to_lowercase();
        self.title.to_lowercase().contains(&query)
            || self.company.to_lowercase().contains(&query)
            || self.location.to_lowercase().contains(&query)
    }
}

/// Sort orders offered by the vacancy board.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum VacancySort {
    /// Most recently posted first; unparseable dates sink to the bottom.
    #[default]
    Newest,
    /// Highest stated salary first; "Negotiable" listings sink to the bottom.
    SalaryHighToLow,
}

impl VacancySort {
    pub fn apply(&self, vacancies: &mut [Vacancy]) {
        match self {
            VacancySort::Newest => {
                vacancies.sort_by(|a, b| b.posted_on().cmp(&a.posted_on()));
            }
            VacancySort::SalaryHighToLow => {
                vacancies.sort_by(|a, b| b.salary_value.cmp(&a.salary_value));
            }
        }
    }
}
