//! [Doc](https://docs.fastlane.tools/best-practices/continuous-integration/#two-step-or-two-factor-auth)

use core::fmt;

use chrono::{DateTime, Utc};

use crate::connection::{Cookie, SessionConnection};

pub const APPLE_ID_COOKIE_DOMAIN: &str = "https://idmsa.apple.com";
pub const FASTLANE_SESSION_ENV: &str = "FASTLANE_SESSION";

const RUBY_COOKIE_TAG: &str = "!ruby/object:HTTP::Cookie";

impl SessionConnection {
    /// `None` when `connection_expiry_date` is not RFC3339.
    pub fn expiry(&self) -> Option<DateTime<Utc>> {
        match DateTime::parse_from_rfc3339(&self.connection_expiry_date) {
            Ok(dt) => Some(dt.with_timezone(&Utc)),
            Err(err) => {
                tracing::warn!(
                    "Could not parse session-based connection expiry date ({}): {err}",
                    self.connection_expiry_date
                );
                None
            }
        }
    }

    /// An unknown expiry never counts as expired.
    pub fn expired(&self, now: impl Into<Option<DateTime<Utc>>>) -> bool {
        let now = now.into().unwrap_or_else(Utc::now);
        match self.expiry() {
            Some(expiry) => expiry < now,
            None => false,
        }
    }

    /// Apple ID login session in the `ruby/object:HTTP::Cookie` YAML dialect,
    /// usable as the value of `FASTLANE_SESSION`.
    pub fn fastlane_login_session(&self) -> Result<String, SessionRenderError> {
        let mut session = String::new();
        self.write_fastlane_login_session(&mut session)?;
        Ok(session)
    }

    /// Writes nothing when there are no Apple ID cookies. A cookie failing to render does not
    /// stop the rest, every failure is reported.
    pub fn write_fastlane_login_session(
        &self,
        w: &mut impl fmt::Write,
    ) -> Result<(), SessionRenderError> {
        let cookies = match self.session_cookies.get(APPLE_ID_COOKIE_DOMAIN) {
            Some(cookies) if !cookies.is_empty() => cookies,
            _ => return Ok(()),
        };

        let mut failures = vec![];
        if let Err(err) = w.write_str("---\n") {
            failures.push(format!("document marker: {err}"));
        }
        for cookie in cookies {
            if let Err(err) = write_ruby_cookie(w, cookie) {
                failures.push(format!("cookie {}: {err}", cookie.name));
            }
        }

        if !failures.is_empty() {
            return Err(SessionRenderError { failures });
        }
        Ok(())
    }
}

pub fn write_ruby_cookie(w: &mut impl fmt::Write, cookie: &Cookie) -> fmt::Result {
    writeln!(w, "- {RUBY_COOKIE_TAG}")?;
    writeln!(w, "  name: {}", cookie.name)?;
    writeln!(w, "  value: {}", cookie.value)?;
    writeln!(w, "  domain: {}", cookie.domain)?;
    writeln!(w, "  for_domain: {}", cookie.for_domain_or_default())?;
    writeln!(w, "  path: \"{}\"", cookie.path)?;
    w.write_char('\n')
}

//
#[derive(thiserror::Error, Debug)]
#[error("failed to render login session: {}", .failures.join("\n"))]
pub struct SessionRenderError {
    pub failures: Vec<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::collections::HashMap;

    fn cookie(name: &str, value: &str) -> Cookie {
        Cookie {
            name: name.to_owned(),
            value: value.to_owned(),
            domain: "idmsa.apple.com".to_owned(),
            path: "/".to_owned(),
            ..Default::default()
        }
    }

    fn session(expiry: &str, cookies: Vec<(&str, Vec<Cookie>)>) -> SessionConnection {
        SessionConnection {
            apple_id: "dev@example.com".to_owned(),
            connection_expiry_date: expiry.to_owned(),
            session_cookies: cookies
                .into_iter()
                .map(|(k, v)| (k.to_owned(), v))
                .collect::<HashMap<_, _>>(),
            ..Default::default()
        }
    }

    #[test]
    fn test_expiry() {
        let conn = session("2021-03-15T09:05:36+01:00", vec![]);
        assert_eq!(
            conn.expiry().unwrap(),
            "2021-03-15T08:05:36Z".parse::<DateTime<Utc>>().unwrap()
        );

        assert!(session("", vec![]).expiry().is_none());
        assert!(session("Mon, 15 Mar 2021 09:05:36 GMT", vec![])
            .expiry()
            .is_none());
    }

    #[test]
    fn test_expired() {
        let now = "2022-06-06T00:00:00Z".parse::<DateTime<Utc>>().unwrap();

        assert!(session("2022-06-05T23:59:59Z", vec![]).expired(now));
        assert!(!session("2022-06-06T00:00:01Z", vec![]).expired(now));
        assert!(!session("2022-06-06T00:00:00Z", vec![]).expired(now));
        assert!(!session("not a date", vec![]).expired(now));

        assert!(session("2000-01-01T00:00:00Z", vec![]).expired(None));
        assert!(!session("2999-01-01T00:00:00Z", vec![]).expired(None));
    }

    #[test]
    fn test_fastlane_login_session() {
        let mut for_domain_false = cookie("c", "3");
        for_domain_false.for_domain = Some(false);
        for_domain_false.path = "/appleauth".to_owned();

        let conn = session(
            "",
            vec![
                (
                    APPLE_ID_COOKIE_DOMAIN,
                    vec![cookie("a", "1"), cookie("b", "2"), for_domain_false],
                ),
                ("https://appstoreconnect.apple.com", vec![cookie("x", "9")]),
            ],
        );

        assert_eq!(
            conn.fastlane_login_session().unwrap(),
            r#"---
- !ruby/object:HTTP::Cookie
  name: a
  value: 1
  domain: idmsa.apple.com
  for_domain: true
  path: "/"

- !ruby/object:HTTP::Cookie
  name: b
  value: 2
  domain: idmsa.apple.com
  for_domain: true
  path: "/"

- !ruby/object:HTTP::Cookie
  name: c
  value: 3
  domain: idmsa.apple.com
  for_domain: false
  path: "/appleauth"

"#
        );
    }

    #[test]
    fn test_fastlane_login_session_order() {
        let conn = session(
            "",
            vec![(APPLE_ID_COOKIE_DOMAIN, vec![cookie("a", "1"), cookie("b", "2")])],
        );
        let s = conn.fastlane_login_session().unwrap();

        assert!(s.starts_with("---\n"));
        assert_eq!(s.matches("---").count(), 1);
        assert_eq!(s.matches("- !ruby/object:HTTP::Cookie").count(), 2);
        let a = s.find("name: a").unwrap();
        let b = s.find("name: b").unwrap();
        assert!(a < b);
    }

    #[test]
    fn test_fastlane_login_session_without_cookies() {
        let conn = session("", vec![("https://appstoreconnect.apple.com", vec![cookie("x", "9")])]);
        assert_eq!(conn.fastlane_login_session().unwrap(), "");

        let conn = session("", vec![(APPLE_ID_COOKIE_DOMAIN, vec![])]);
        assert_eq!(conn.fastlane_login_session().unwrap(), "");
    }

    // Fails whenever one of the given fragments is written.
    struct RejectingWriter {
        out: String,
        rejected: Vec<&'static str>,
    }

    impl fmt::Write for RejectingWriter {
        fn write_str(&mut self, s: &str) -> fmt::Result {
            if self.rejected.contains(&s) {
                return Err(fmt::Error);
            }
            self.out.push_str(s);
            Ok(())
        }
    }

    #[test]
    fn test_write_fastlane_login_session() {
        let conn = session(
            "",
            vec![(APPLE_ID_COOKIE_DOMAIN, vec![cookie("a", "1"), cookie("b", "2")])],
        );

        let mut w = RejectingWriter {
            out: String::new(),
            rejected: vec![],
        };
        conn.write_fastlane_login_session(&mut w).unwrap();
        assert_eq!(w.out, conn.fastlane_login_session().unwrap());
    }

    #[test]
    fn test_write_fastlane_login_session_with_failing_writer() {
        let conn = session(
            "",
            vec![(
                APPLE_ID_COOKIE_DOMAIN,
                vec![cookie("a", "1"), cookie("b", "2"), cookie("c", "3")],
            )],
        );

        let mut w = RejectingWriter {
            out: String::new(),
            rejected: vec!["a", "c"],
        };
        let err = conn.write_fastlane_login_session(&mut w).unwrap_err();

        assert_eq!(
            err.failures,
            vec![
                "cookie a: an error occurred when formatting an argument".to_owned(),
                "cookie c: an error occurred when formatting an argument".to_owned(),
            ]
        );
        assert_eq!(
            err.to_string(),
            "failed to render login session: \
             cookie a: an error occurred when formatting an argument\n\
             cookie c: an error occurred when formatting an argument"
        );
        assert!(w.out.contains("  name: b\n  value: 2\n"));
    }
}
