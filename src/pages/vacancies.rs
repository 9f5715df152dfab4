//! Vacancy board controller: job listings with search and sorting.

use crate::api::{ApiError, DataClient};
use crate::models::{Vacancy, VacancySort};

#[derive(Default)]
pub struct VacancyBoard {
    vacancies: Vec<Vacancy>,
    query: String,
    sort: VacancySort,
}

impl VacancyBoard {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fetch all listings, newest first. Sorting beyond that happens
    /// locally so flipping the sort order needs no round trip.
    pub async fn load(&mut self, db: &DataClient) -> Result<(), ApiError> {
        self.vacancies = db
            .select("vacancies", &[("select", "*"), ("order", "datePosted.desc")])
            .await?;
        Ok(())
    }

    pub fn set_query(&mut self, query: &str) {
        self.query = query.to_string();
    }

    pub fn set_sort(&mut self, sort: VacancySort) {
        self.sort = sort;
    }

    /// Listings matching the current search, in the current sort order.
    pub fn visible(&self) -> Vec<Vacancy> {
        let mut visible: Vec<Vacancy> = self
            .vacancies
            .iter()
            .filter(|v| v.matches(&self.query))
            .cloned()
            .collect();
        self.sort.apply(&mut visible);
        visible
    }

    pub fn len(&self) -> usize {
        self.vacancies.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vacancies.is_empty()
    }

    #[cfg(test)]
    pub(crate) fn set_vacancies(&mut self, vacancies: Vec<Vacancy>) {
        self.vacancies = vacancies;
    }
}
