//! Deterministic value provider.
//!
//! Every random draw of a run goes through one [`ValueProvider`], which owns a
//! single seeded `ChaCha8Rng`. Two providers built from the same seed and
//! anchor date produce the same sequence of values for the same sequence of
//! calls.

use std::collections::{HashMap, HashSet};

use chrono::{Datelike, NaiveDate, TimeDelta};
use fake::Fake;
use fake::faker::address::en::{BuildingNumber, CityName, StateAbbr, StreetName, ZipCode};
use fake::faker::company::en::CompanyName;
use fake::faker::internet::en::SafeEmail;
use fake::faker::lorem::en::Sentence;
use fake::faker::name::en::{FirstName, LastName};
use rand::seq::IndexedRandom;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

use crate::errors::GenerationError;

/// Draws allowed before a unique value is declared impossible.
pub const MAX_UNIQUE_ATTEMPTS: u32 = 100;

const ZIPCODE_MIN: i64 = 501;
const ZIPCODE_MAX: i64 = 99950;
const ZIPCODE_FALLBACK: i64 = 10000;
const DAYS_PER_YEAR: i64 = 365;

/// Truncate `value` to its first `max_len` characters.
pub fn clip(mut value: String, max_len: Option<usize>) -> String {
    if let Some(max_len) = max_len
        && let Some((index, _)) = value.char_indices().nth(max_len)
    {
        value.truncate(index);
    }
    value
}

pub struct ValueProvider {
    rng: ChaCha8Rng,
    today: NaiveDate,
    seen: HashMap<String, HashSet<String>>,
}

impl ValueProvider {
    pub fn new(seed: u64, today: NaiveDate) -> Self {
        Self {
            rng: ChaCha8Rng::seed_from_u64(seed),
            today,
            seen: HashMap::new(),
        }
    }

    /// Anchor date every relative date is computed from.
    pub fn today(&self) -> NaiveDate {
        self.today
    }

    pub fn rng(&mut self) -> &mut ChaCha8Rng {
        &mut self.rng
    }

    pub fn uniform_f64(&mut self, min: f64, max: f64) -> f64 {
        if max <= min {
            return min;
        }
        self.rng.random_range(min..=max)
    }

    /// Inclusive integer draw.
    pub fn uniform_i64(&mut self, min: i64, max: i64) -> i64 {
        if max <= min {
            return min;
        }
        self.rng.random_range(min..=max)
    }

    /// Uniform amount rounded to cents.
    pub fn money(&mut self, min: f64, max: f64) -> f64 {
        let value = self.uniform_f64(min, max);
        ((value * 100.0).round() / 100.0).clamp(min, max.max(min))
    }

    pub fn chance(&mut self, probability: f64) -> bool {
        self.rng.random_bool(probability.clamp(0.0, 1.0))
    }

    pub fn choose<'a, T>(&mut self, items: &'a [T]) -> Option<&'a T> {
        items.choose(&mut self.rng)
    }

    /// Date between `min_days` and `max_days` before the anchor.
    pub fn past(&mut self, min_days: i64, max_days: i64) -> NaiveDate {
        let days = self.uniform_i64(min_days, max_days);
        self.days_before_today(days)
    }

    pub fn past_years(&mut self, min_years: i64, max_years: i64) -> NaiveDate {
        self.past(min_years * DAYS_PER_YEAR, max_years * DAYS_PER_YEAR)
    }

    /// Same month and day `min_years..=max_years` ahead; `today + 365·N` days
    /// when that calendar day does not exist.
    pub fn future(&mut self, min_years: i32, max_years: i32) -> NaiveDate {
        let years = self.uniform_i64(min_years as i64, max_years as i64) as i32;
        self.today
            .with_year(self.today.year() + years)
            .unwrap_or_else(|| add_days(self.today, years as i64 * DAYS_PER_YEAR))
    }

    pub fn birthdate_for_age(&mut self, min_age: i64, max_age: i64) -> NaiveDate {
        let age = self.uniform_i64(min_age, max_age);
        let days = age * DAYS_PER_YEAR + self.uniform_i64(0, DAYS_PER_YEAR - 1);
        self.days_before_today(days)
    }

    /// Inclusive date draw; returns `start` when the range is empty.
    pub fn between(&mut self, start: NaiveDate, end: NaiveDate) -> NaiveDate {
        let span = (end - start).num_days();
        add_days(start, self.uniform_i64(0, span.max(0)))
    }

    pub fn first_name(&mut self, max_len: Option<usize>) -> String {
        clip(FirstName().fake_with_rng(&mut self.rng), max_len)
    }

    pub fn last_name(&mut self, max_len: Option<usize>) -> String {
        clip(LastName().fake_with_rng(&mut self.rng), max_len)
    }

    pub fn street_address(&mut self, max_len: Option<usize>) -> String {
        let number: String = BuildingNumber().fake_with_rng(&mut self.rng);
        let street: String = StreetName().fake_with_rng(&mut self.rng);
        clip(format!("{number} {street}"), max_len)
    }

    pub fn city(&mut self, max_len: Option<usize>) -> String {
        clip(CityName().fake_with_rng(&mut self.rng), max_len)
    }

    /// US state abbreviation.
    pub fn state(&mut self, max_len: Option<usize>) -> String {
        clip(StateAbbr().fake_with_rng(&mut self.rng), max_len)
    }

    pub fn email(&mut self, max_len: Option<usize>) -> String {
        clip(SafeEmail().fake_with_rng(&mut self.rng), max_len)
    }

    /// `NNN-NNN-NNNN` with a non-zero, non-one leading digit.
    pub fn phone(&mut self, max_len: Option<usize>) -> String {
        let area = self.uniform_i64(200, 999);
        let exchange = self.uniform_i64(100, 999);
        let line = self.uniform_i64(1000, 9999);
        clip(format!("{area}-{exchange}-{line}"), max_len)
    }

    pub fn company(&mut self, max_len: Option<usize>) -> String {
        clip(CompanyName().fake_with_rng(&mut self.rng), max_len)
    }

    /// Four-word sentence.
    pub fn sentence(&mut self, max_len: Option<usize>) -> String {
        clip(Sentence(4..5).fake_with_rng(&mut self.rng), max_len)
    }

    /// Five-digit US zipcode within the valid numeric range.
    pub fn zipcode(&mut self) -> i64 {
        let raw: String = ZipCode().fake_with_rng(&mut self.rng);
        let digits: String = raw
            .split('-')
            .next()
            .unwrap_or_default()
            .chars()
            .take(5)
            .collect();
        digits
            .parse::<i64>()
            .unwrap_or(ZIPCODE_FALLBACK)
            .clamp(ZIPCODE_MIN, ZIPCODE_MAX)
    }

    pub fn sex(&mut self, max_len: Option<usize>) -> String {
        let sex = if self.rng.random_bool(0.5) { "M" } else { "F" };
        clip(sex.to_string(), max_len)
    }

    pub fn card_number(&mut self, max_len: Option<usize>) -> String {
        let digits: String = (0..16)
            .map(|_| char::from(b'0' + self.rng.random_range(0..10u8)))
            .collect();
        clip(digits, max_len)
    }

    /// Draw until a clipped value unseen within `scope` comes up.
    pub fn unique<F>(
        &mut self,
        scope: &str,
        max_len: Option<usize>,
        mut draw: F,
    ) -> Result<String, GenerationError>
    where
        F: FnMut(&mut Self) -> String,
    {
        for _ in 0..MAX_UNIQUE_ATTEMPTS {
            let candidate = clip(draw(self), max_len);
            if self
                .seen
                .entry(scope.to_string())
                .or_default()
                .insert(candidate.clone())
            {
                return Ok(candidate);
            }
        }
        Err(GenerationError::DuplicateConstraintViolation {
            scope: scope.to_string(),
            attempts: MAX_UNIQUE_ATTEMPTS,
        })
    }

    pub fn unique_email(&mut self, max_len: Option<usize>) -> Result<String, GenerationError> {
        self.unique("email", max_len, |values| values.email(None))
    }

    fn days_before_today(&self, days: i64) -> NaiveDate {
        add_days(self.today, -days)
    }
}

fn add_days(date: NaiveDate, days: i64) -> NaiveDate {
    date.checked_add_signed(TimeDelta::days(days))
        .unwrap_or(date)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn day(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn provider(seed: u64) -> ValueProvider {
        ValueProvider::new(seed, day(2024, 6, 15))
    }

    #[test]
    fn clip_keeps_leading_characters() {
        assert_eq!(clip("Hello World".to_string(), Some(5)), "Hello");
        assert_eq!(clip("Hi".to_string(), Some(5)), "Hi");
        assert_eq!(clip("Ünïcode".to_string(), Some(3)), "Ünï");
        assert_eq!(clip("unbounded".to_string(), None), "unbounded");
    }

    #[test]
    fn same_seed_same_sequence() {
        let mut a = provider(42);
        let mut b = provider(42);
        for _ in 0..20 {
            assert_eq!(a.first_name(Some(30)), b.first_name(Some(30)));
            assert_eq!(a.money(0.0, 50_000.0), b.money(0.0, 50_000.0));
            assert_eq!(a.past_years(0, 10), b.past_years(0, 10));
        }
    }

    #[test]
    fn different_seeds_diverge() {
        let mut a = provider(1);
        let mut b = provider(2);
        let left: Vec<String> = (0..10).map(|_| a.card_number(None)).collect();
        let right: Vec<String> = (0..10).map(|_| b.card_number(None)).collect();
        assert_ne!(left, right);
    }

    #[test]
    fn future_falls_back_on_missing_leap_day() {
        let mut values = ValueProvider::new(7, day(2024, 2, 29));
        assert_eq!(values.future(1, 1), day(2025, 2, 28));

        let mut values = provider(7);
        assert_eq!(values.future(2, 2), day(2026, 6, 15));
    }

    #[test]
    fn birthdates_match_requested_age() {
        let mut values = provider(3);
        for _ in 0..200 {
            let dob = values.birthdate_for_age(18, 90);
            let days = (values.today() - dob).num_days();
            assert!((18 * 365..=90 * 365 + 364).contains(&days));
        }
    }

    #[test]
    fn formatted_values_have_expected_shape() {
        let mut values = provider(9);
        for _ in 0..100 {
            let phone = values.phone(Some(15));
            let parts: Vec<&str> = phone.split('-').collect();
            assert_eq!(parts.iter().map(|part| part.len()).collect::<Vec<_>>(), [3, 3, 4]);

            let zip = values.zipcode();
            assert!((501..=99950).contains(&zip));

            let card = values.card_number(Some(16));
            assert_eq!(card.len(), 16);
            assert!(card.chars().all(|c| c.is_ascii_digit()));

            assert!(["M", "F"].contains(&values.sex(Some(1)).as_str()));
            assert!(values.state(Some(2)).chars().count() <= 2);
        }
    }

    #[test]
    fn money_has_two_decimals_and_stays_in_range() {
        let mut values = provider(5);
        for _ in 0..200 {
            let amount = values.money(1.0, 2500.0);
            assert!((1.0..=2500.0).contains(&amount));
            assert!(((amount * 100.0).round() - amount * 100.0).abs() < 1e-6);
        }
    }

    #[test]
    fn unique_values_are_distinct_after_clipping() {
        let mut values = provider(11);
        let emails: HashSet<String> = (0..300)
            .map(|_| values.unique_email(Some(50)).unwrap())
            .collect();
        assert_eq!(emails.len(), 300);
        assert!(emails.iter().all(|email| email.chars().count() <= 50));
    }

    #[test]
    fn unique_gives_up_after_bounded_attempts() {
        let mut values = provider(13);
        assert_eq!(
            values.unique("code", None, |_| "same".to_string()).unwrap(),
            "same"
        );
        let err = values
            .unique("code", None, |_| "same".to_string())
            .unwrap_err();
        assert!(matches!(
            err,
            GenerationError::DuplicateConstraintViolation { attempts: MAX_UNIQUE_ATTEMPTS, .. }
        ));

        // Scopes are independent.
        assert!(values.unique("other", None, |_| "same".to_string()).is_ok());
    }
}
