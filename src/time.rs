use std::fmt;

use chrono::{DateTime, FixedOffset, Local, TimeZone, Utc};

use crate::error::{Error, Result};

/// which identity environment variables to read
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SignatureKind {
    Author,
    Committer,
}

impl SignatureKind {
    fn prefix(self) -> &'static str {
        match self {
            SignatureKind::Author => "GIT_AUTHOR",
            SignatureKind::Committer => "GIT_COMMITTER",
        }
    }
}

/// an author/committer line: name, email, unix timestamp, UTC offset
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Signature {
    pub name: String,
    pub email: String,
    pub timestamp: i64,
    /// offset from UTC in minutes, e.g. `-0400` is `-240`
    pub offset_minutes: i32,
}

impl Signature {
    pub fn new(name: impl Into<String>, email: impl Into<String>, timestamp: i64, offset_minutes: i32) -> Self {
        Self {
            name: name.into(),
            email: email.into(),
            timestamp,
            offset_minutes,
        }
    }

    /// read name/email/date from the matching `GIT_AUTHOR_*`/`GIT_COMMITTER_*` triple,
    /// falling back to the current wall-clock time when `*_DATE` is unset
    pub fn from_env(kind: SignatureKind) -> Result<Self> {
        let prefix = kind.prefix();
        let name = std::env::var(format!("{prefix}_NAME")).unwrap_or_else(|_| "unknown".to_string());
        let email = std::env::var(format!("{prefix}_EMAIL")).unwrap_or_else(|_| "unknown@localhost".to_string());

        let (timestamp, offset_minutes) = match std::env::var(format!("{prefix}_DATE")) {
            Ok(date) => parse_date(&date)?,
            Err(_) => {
                let now = Local::now();
                (now.timestamp(), now.offset().local_minus_utc() / 60)
            }
        };

        Ok(Self { name, email, timestamp, offset_minutes })
    }

    /// the `"<unix-ts> <±HHMM>"` suffix used in object bodies
    pub fn format_date(&self) -> String {
        format!("{} {}", self.timestamp, format_offset(self.offset_minutes))
    }

    /// full `"<name> <email> <unix-ts> <±HHMM>"` line as it appears in commit/tag bodies
    pub fn to_header(&self) -> String {
        format!("{} <{}> {}", self.name, self.email, self.format_date())
    }

    /// parse a header line previously produced by `to_header`
    pub fn parse(line: &str) -> Result<Self> {
        let open = line.rfind('<').ok_or_else(|| Error::InvalidObjectHeader(line.to_string()))?;
        let close = line.rfind('>').ok_or_else(|| Error::InvalidObjectHeader(line.to_string()))?;
        if close < open {
            return Err(Error::InvalidObjectHeader(line.to_string()));
        }

        let name = line[..open].trim().to_string();
        let email = line[open + 1..close].to_string();
        let rest = line[close + 1..].trim();

        let mut parts = rest.split_whitespace();
        let timestamp: i64 = parts
            .next()
            .ok_or_else(|| Error::InvalidObjectHeader(line.to_string()))?
            .parse()
            .map_err(|_| Error::InvalidObjectHeader(line.to_string()))?;
        let offset_str = parts.next().ok_or_else(|| Error::InvalidObjectHeader(line.to_string()))?;
        let offset_minutes = parse_offset(offset_str)?;

        Ok(Self { name, email, timestamp, offset_minutes })
    }

    /// human-readable rendering for `log`, e.g. `Mon Jan 2 15:04:05 2006 -0700`
    pub fn to_local_datetime(&self) -> DateTime<FixedOffset> {
        let offset = FixedOffset::east_opt(self.offset_minutes * 60).unwrap_or_else(|| FixedOffset::east_opt(0).unwrap());
        Utc.timestamp_opt(self.timestamp, 0)
            .single()
            .unwrap_or_else(|| Utc.timestamp_opt(0, 0).single().unwrap())
            .with_timezone(&offset)
    }
}

impl fmt::Display for Signature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} <{}>", self.name, self.email)
    }
}

fn format_offset(offset_minutes: i32) -> String {
    let sign = if offset_minutes < 0 { '-' } else { '+' };
    let abs = offset_minutes.unsigned_abs();
    format!("{sign}{:02}{:02}", abs / 60, abs % 60)
}

fn parse_offset(s: &str) -> Result<i32> {
    if s.len() != 5 || !(s.starts_with('+') || s.starts_with('-')) {
        return Err(Error::InvalidObjectHeader(s.to_string()));
    }
    let hours: i32 = s[1..3].parse().map_err(|_| Error::InvalidObjectHeader(s.to_string()))?;
    let minutes: i32 = s[3..5].parse().map_err(|_| Error::InvalidObjectHeader(s.to_string()))?;
    let total = hours * 60 + minutes;
    Ok(if s.starts_with('-') { -total } else { total })
}

/// accepts either ISO-8601 with an explicit offset or `"<unix-ts> <±HHMM>"`
fn parse_date(s: &str) -> Result<(i64, i32)> {
    let s = s.trim();
    if let Some((ts, offset)) = s.split_once(' ') {
        if let (Ok(ts), Ok(offset_minutes)) = (ts.parse::<i64>(), parse_offset(offset)) {
            return Ok((ts, offset_minutes));
        }
    }
    DateTime::parse_from_rfc3339(s)
        .map(|dt| (dt.timestamp(), dt.offset().local_minus_utc() / 60))
        .map_err(|_| Error::InvalidObjectHeader(s.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_header_roundtrip() {
        let sig = Signature::new("Ada Lovelace", "ada@example.com", 1_700_000_000, -240);
        let header = sig.to_header();
        assert_eq!(header, "Ada Lovelace <ada@example.com> 1700000000 -0400");
        let parsed = Signature::parse(&header).unwrap();
        assert_eq!(parsed, sig);
    }

    #[test]
    fn test_format_offset_positive() {
        assert_eq!(format_offset(330), "+0530");
    }

    #[test]
    fn test_format_offset_negative() {
        assert_eq!(format_offset(-240), "-0400");
    }

    #[test]
    fn test_parse_date_unix_form() {
        let (ts, offset) = parse_date("1700000000 +0530").unwrap();
        assert_eq!(ts, 1_700_000_000);
        assert_eq!(offset, 330);
    }

    #[test]
    fn test_parse_date_iso8601() {
        let (ts, offset) = parse_date("2023-11-14T22:13:20+05:30").unwrap();
        assert_eq!(ts, 1_700_000_000);
        assert_eq!(offset, 330);
    }

    #[test]
    fn test_parse_invalid_header() {
        assert!(Signature::parse("not a valid header").is_err());
    }
}
