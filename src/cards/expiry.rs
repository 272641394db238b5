// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! `MM/YY` expiry dates.
//!
//! A card stays valid through the last calendar day of its expiry month and
//! is expired from the first day of the following month.

use chrono::{Months, NaiveDate};

use super::error::{CardError, INVALID_EXPIRY};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExpiryDate {
    last_valid_day: NaiveDate,
}

impl ExpiryDate {
    /// Parse `MM/YY`. Years are in the 2000s.
    ///
    /// Accepts one- or two-digit parts; card creation applies the stricter
    /// two-digit format check separately.
    pub fn parse(raw: &str) -> Result<Self, CardError> {
        let parts: Vec<&str> = raw.split('/').collect();
        let [month, year] = parts.as_slice() else {
            return Err(CardError::operation(INVALID_EXPIRY));
        };

        let month = parse_part(month)?;
        let year = 2000 + parse_part(year)? as i32;
        if !(1..=12).contains(&month) {
            return Err(CardError::operation(INVALID_EXPIRY));
        }

        let last_valid_day = NaiveDate::from_ymd_opt(year, month, 1)
            .and_then(|first| first.checked_add_months(Months::new(1)))
            .and_then(|next| next.pred_opt())
            .ok_or_else(|| CardError::operation(INVALID_EXPIRY))?;

        Ok(Self { last_valid_day })
    }

    pub fn is_expired_on(&self, today: NaiveDate) -> bool {
        today > self.last_valid_day
    }
}

/// Whether an `MM/YY` expiry has passed as of `today`.
pub fn is_expired(raw: &str, today: NaiveDate) -> Result<bool, CardError> {
    Ok(ExpiryDate::parse(raw)?.is_expired_on(today))
}

/// Strict `MM/YY` shape check used when a card is created.
pub fn is_well_formed(raw: &str) -> bool {
    let bytes = raw.as_bytes();
    bytes.len() == 5
        && bytes[2] == b'/'
        && bytes[..2].iter().all(u8::is_ascii_digit)
        && bytes[3..].iter().all(u8::is_ascii_digit)
        && ExpiryDate::parse(raw).is_ok()
}

fn parse_part(part: &str) -> Result<u32, CardError> {
    if part.is_empty() || part.len() > 2 || !part.bytes().all(|b| b.is_ascii_digit()) {
        return Err(CardError::operation(INVALID_EXPIRY));
    }
    part.parse()
        .map_err(|_| CardError::operation(INVALID_EXPIRY))
}
