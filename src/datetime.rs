//! DateTime encoding (Spec 7.1.8, Table 7-3/7-4).
//!
//! Alle acht XML-Schema-Datumstypen teilen sich fuenf Komponenten:
//! Year (Integer, Offset 2000), MonthDay (9 Bits, month·32+day),
//! Time (17 Bits, ((hh·64)+mm)·64+ss), FractionalSecs (Praesenz-Bit +
//! Unsigned Integer der umgekehrten Ziffernfolge) und TimeZone
//! (Praesenz-Bit + 11 Bits, hours·64+minutes+896).

use core::fmt;

use crate::channel::{DecoderChannel, EncoderChannel};
use crate::{Error, Result, boolean, integer, n_bit_unsigned_integer, unsigned_integer};

/// Which XML Schema date-time type a value carries (Spec Table 7-4).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DateTimeKind {
    GYear,
    GYearMonth,
    Date,
    DateTime,
    GMonth,
    GMonthDay,
    GDay,
    Time,
}

impl DateTimeKind {
    fn has_year(self) -> bool {
        matches!(self, Self::GYear | Self::GYearMonth | Self::Date | Self::DateTime)
    }

    fn has_month_day(self) -> bool {
        matches!(
            self,
            Self::GYearMonth | Self::Date | Self::DateTime | Self::GMonth | Self::GMonthDay | Self::GDay
        )
    }

    fn has_time(self) -> bool {
        matches!(self, Self::DateTime | Self::Time)
    }
}

/// A date-time value with only the components its kind uses (Spec 7.1.8).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DateTime {
    pub kind: DateTimeKind,
    pub year: i64,
    pub month: u8,
    pub day: u8,
    pub hour: u8,
    pub minute: u8,
    pub second: u8,
    /// Sekundenbruchteil-Ziffern in normaler Reihenfolge, ohne nachlaufende Nullen.
    pub fractional_secs: Option<String>,
    /// Timezone-Offset als (Stunden, Minuten), beide mit Vorzeichen des Offsets.
    pub timezone: Option<(i8, i8)>,
}

impl DateTime {
    fn empty(kind: DateTimeKind) -> Self {
        Self {
            kind,
            year: 0,
            month: 0,
            day: 0,
            hour: 0,
            minute: 0,
            second: 0,
            fractional_secs: None,
            timezone: None,
        }
    }

    /// Parst die lexikalische Form des jeweiligen XSD-Typs.
    pub fn parse(kind: DateTimeKind, lexical: &str) -> Result<Self> {
        let mut dt = Self::empty(kind);
        let err = || Error::InvalidValue(format!("not a {kind:?}: '{lexical}'"));

        let (body, tz) = split_timezone(lexical);
        dt.timezone = match tz {
            Some(t) => Some(parse_timezone(t).ok_or_else(err)?),
            None => None,
        };

        let mut rest = body;
        if kind.has_year() {
            // Negatives Jahr hat ein fuehrendes '-'
            let (negative, r) = match rest.strip_prefix('-') {
                Some(r) => (true, r),
                None => (false, rest),
            };
            let end = r.find('-').unwrap_or(r.len());
            let year: i64 = r[..end].parse().map_err(|_| err())?;
            dt.year = if negative { -year } else { year };
            rest = r[end..].strip_prefix('-').unwrap_or(&r[end..]);
        }
        match kind {
            DateTimeKind::GMonth => {
                let r = rest.strip_prefix("--").ok_or_else(err)?;
                dt.month = parse_2digit(r.get(..2).ok_or_else(err)?).ok_or_else(err)?;
            }
            DateTimeKind::GMonthDay => {
                let r = rest.strip_prefix("--").ok_or_else(err)?;
                dt.month = parse_2digit(r.get(..2).ok_or_else(err)?).ok_or_else(err)?;
                let r = r.get(2..).and_then(|s| s.strip_prefix('-')).ok_or_else(err)?;
                dt.day = parse_2digit(r.get(..2).ok_or_else(err)?).ok_or_else(err)?;
            }
            DateTimeKind::GDay => {
                let r = rest.strip_prefix("---").ok_or_else(err)?;
                dt.day = parse_2digit(r.get(..2).ok_or_else(err)?).ok_or_else(err)?;
            }
            DateTimeKind::GYearMonth => {
                dt.month = parse_2digit(rest.get(..2).ok_or_else(err)?).ok_or_else(err)?;
            }
            DateTimeKind::Date | DateTimeKind::DateTime => {
                dt.month = parse_2digit(rest.get(..2).ok_or_else(err)?).ok_or_else(err)?;
                let r = rest.get(2..).and_then(|s| s.strip_prefix('-')).ok_or_else(err)?;
                dt.day = parse_2digit(r.get(..2).ok_or_else(err)?).ok_or_else(err)?;
                rest = r.get(2..).unwrap_or("");
            }
            _ => {}
        }
        if kind.has_time() {
            let t = match kind {
                DateTimeKind::DateTime => rest.strip_prefix('T').ok_or_else(err)?,
                _ => rest,
            };
            dt.hour = parse_2digit(t.get(..2).ok_or_else(err)?).ok_or_else(err)?;
            let t = t.get(2..).and_then(|s| s.strip_prefix(':')).ok_or_else(err)?;
            dt.minute = parse_2digit(t.get(..2).ok_or_else(err)?).ok_or_else(err)?;
            let t = t.get(2..).and_then(|s| s.strip_prefix(':')).ok_or_else(err)?;
            dt.second = parse_2digit(t.get(..2).ok_or_else(err)?).ok_or_else(err)?;
            if let Some(frac) = t.get(2..).and_then(|s| s.strip_prefix('.')) {
                if frac.is_empty() || frac.bytes().any(|b| !b.is_ascii_digit()) {
                    return Err(err());
                }
                let trimmed = frac.trim_end_matches('0');
                if !trimmed.is_empty() {
                    dt.fractional_secs = Some(trimmed.to_string());
                }
            }
        }
        Ok(dt)
    }
}

fn parse_2digit(s: &str) -> Option<u8> {
    if s.len() == 2 && s.bytes().all(|b| b.is_ascii_digit()) {
        s.parse().ok()
    } else {
        None
    }
}

/// Trennt den Timezone-Teil ab ("Z", "+hh:mm", "-hh:mm" am Ende).
fn split_timezone(lexical: &str) -> (&str, Option<&str>) {
    if let Some(body) = lexical.strip_suffix('Z') {
        return (body, Some("Z"));
    }
    // "±hh:mm" sind immer die letzten 6 Zeichen; das Minus eines negativen
    // Jahres steht vorn und ist nie Teil davon.
    if lexical.len() > 6 {
        let (body, tail) = lexical.split_at(lexical.len() - 6);
        if (tail.starts_with('+') || tail.starts_with('-')) && tail.as_bytes()[3] == b':' {
            return (body, Some(tail));
        }
    }
    (lexical, None)
}

fn parse_timezone(tz: &str) -> Option<(i8, i8)> {
    if tz == "Z" {
        return Some((0, 0));
    }
    let negative = tz.starts_with('-');
    let hours = parse_2digit(tz.get(1..3)?)? as i8;
    let minutes = parse_2digit(tz.get(4..6)?)? as i8;
    if negative {
        Some((-hours, -minutes))
    } else {
        Some((hours, minutes))
    }
}

impl fmt::Display for DateTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.kind {
            DateTimeKind::GYear => write!(f, "{:04}", self.year)?,
            DateTimeKind::GYearMonth => write!(f, "{:04}-{:02}", self.year, self.month)?,
            DateTimeKind::Date => {
                write!(f, "{:04}-{:02}-{:02}", self.year, self.month, self.day)?
            }
            DateTimeKind::DateTime => write!(
                f,
                "{:04}-{:02}-{:02}T{:02}:{:02}:{:02}",
                self.year, self.month, self.day, self.hour, self.minute, self.second
            )?,
            DateTimeKind::GMonth => write!(f, "--{:02}", self.month)?,
            DateTimeKind::GMonthDay => write!(f, "--{:02}-{:02}", self.month, self.day)?,
            DateTimeKind::GDay => write!(f, "---{:02}", self.day)?,
            DateTimeKind::Time => {
                write!(f, "{:02}:{:02}:{:02}", self.hour, self.minute, self.second)?
            }
        }
        if let Some(frac) = &self.fractional_secs {
            write!(f, ".{frac}")?;
        }
        if let Some((h, m)) = self.timezone {
            if h == 0 && m == 0 {
                write!(f, "Z")?;
            } else {
                let sign = if h < 0 || m < 0 { '-' } else { '+' };
                write!(f, "{sign}{:02}:{:02}", h.abs(), m.abs())?;
            }
        }
        Ok(())
    }
}

/// Encodes a date-time value (Spec 7.1.8, component order per Table 7-3).
pub fn encode(channel: &mut EncoderChannel, value: &DateTime) -> Result<()> {
    let kind = value.kind;
    if kind.has_year() {
        integer::encode(channel, value.year - 2000);
    }
    if kind.has_month_day() {
        let month_day = match kind {
            DateTimeKind::GMonth => value.month as u64 * 32,
            DateTimeKind::GDay => value.day as u64,
            _ => value.month as u64 * 32 + value.day as u64,
        };
        n_bit_unsigned_integer::encode(channel, month_day, 9);
    }
    if kind.has_time() {
        let time = ((value.hour as u64 * 64) + value.minute as u64) * 64 + value.second as u64;
        n_bit_unsigned_integer::encode(channel, time, 17);
        match &value.fractional_secs {
            Some(frac) => {
                boolean::encode(channel, true);
                let reversed: String = frac.chars().rev().collect();
                unsigned_integer::encode_digits(channel, &reversed)?;
            }
            None => boolean::encode(channel, false),
        }
    }
    match value.timezone {
        Some((h, m)) => {
            boolean::encode(channel, true);
            // 896 = 14 * 64 (Spec 7.1.8, Table 7-3)
            let raw = (h as i32 * 64 + m as i32 + 896) as u64;
            n_bit_unsigned_integer::encode(channel, raw, 11);
        }
        None => boolean::encode(channel, false),
    }
    Ok(())
}

/// Decodes a date-time value of the given kind (Spec 7.1.8).
pub fn decode(channel: &mut DecoderChannel, kind: DateTimeKind) -> Result<DateTime> {
    let mut dt = DateTime::empty(kind);
    if kind.has_year() {
        dt.year = integer::decode(channel)?
            .checked_add(2000)
            .ok_or(Error::IntegerOverflow)?;
    }
    if kind.has_month_day() {
        let month_day = n_bit_unsigned_integer::decode(channel, 9)?;
        match kind {
            DateTimeKind::GDay => dt.day = month_day as u8,
            _ => {
                dt.month = (month_day / 32) as u8;
                dt.day = (month_day % 32) as u8;
            }
        }
    }
    if kind.has_time() {
        let time = n_bit_unsigned_integer::decode(channel, 17)?;
        dt.second = (time % 64) as u8;
        dt.minute = ((time / 64) % 64) as u8;
        dt.hour = (time / 64 / 64) as u8;
        if boolean::decode(channel)? {
            let reversed = unsigned_integer::decode_digits(channel)?;
            dt.fractional_secs = Some(reversed.chars().rev().collect());
        }
    }
    if boolean::decode(channel)? {
        let raw = n_bit_unsigned_integer::decode(channel, 11)? as i32 - 896;
        dt.timezone = Some(((raw / 64) as i8, (raw % 64) as i8));
    }
    Ok(dt)
}
