use tdsver::{resolve, Error, ScalarQuery, TdsVersion, VersionLabel, PROTOCOL_VERSION_QUERY};

/// Answers only the protocol version query, like a session would.
struct FixedSession(i32);

impl ScalarQuery for FixedSession {
    fn fetch_scalar(&mut self, sql: &str) -> tdsver::Result<Option<i32>> {
        if sql == PROTOCOL_VERSION_QUERY {
            Ok(Some(self.0))
        } else {
            Err(Error::Config(format!("unexpected query: {}", sql).into()))
        }
    }
}

#[test]
fn tds_4_2_session() {
    let mut session = FixedSession(67239936);
    assert_eq!("4.2", resolve(&mut session).unwrap().to_string());
}

#[test]
fn tds_7_4_session() {
    let mut session = FixedSession(1946157060);
    let label = resolve(&mut session).unwrap();
    assert_eq!(VersionLabel::Known(TdsVersion::V7_4), label);
    assert_eq!(1946157060, label.code());
}

#[test]
fn uncataloged_version() {
    let mut session = FixedSession(123456);
    let label = resolve(&mut session).unwrap();
    assert_eq!("unknown (123456)", label.to_string());
    assert_eq!(None, label.version());
}

#[test]
fn boxed_sessions() {
    let mut sessions: Vec<Box<dyn ScalarQuery>> = vec![
        Box::new(FixedSession(117440512)),
        Box::new(FixedSession(1895825409)),
        Box::new(FixedSession(-1)),
    ];

    let labels: Vec<String> = sessions
        .iter_mut()
        .map(|s| resolve(s.as_mut()).unwrap().to_string())
        .collect();

    assert_eq!(vec!["7.0", "7.1", "unknown (-1)"], labels);
}
