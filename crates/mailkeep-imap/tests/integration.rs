//! Full scripted-session test against a mock stream.

#![allow(clippy::unwrap_used)]

use chrono::NaiveDate;
use mailkeep_imap::{Client, Uid};
use tokio_test::io::Builder;

const RAW_MESSAGE: &[u8] = b"From: a@example.com\r\n\
                             Subject: hi\r\n\
                             \r\n\
                             body text";

#[tokio::test]
async fn poll_session_round_trip() {
    let fetch_reply = format!(
        "* 1 FETCH (UID 42 BODY[] {{{}}}\r\n",
        RAW_MESSAGE.len()
    );

    let mock = Builder::new()
        .read(b"* OK IMAP4rev1 service ready\r\n")
        .write(b"K0000 LOGIN \"user@example.com\" \"secret\"\r\n")
        .read(b"K0000 OK LOGIN completed\r\n")
        .write(b"K0001 SELECT \"INBOX\"\r\n")
        .read(b"* 1 EXISTS\r\n")
        .read(b"* FLAGS (\\Answered \\Flagged \\Deleted \\Seen \\Draft)\r\n")
        .read(b"K0001 OK [READ-WRITE] SELECT completed\r\n")
        .write(b"K0002 UID SEARCH SINCE 5-Aug-2026\r\n")
        .read(b"* SEARCH 42\r\n")
        .read(b"K0002 OK SEARCH completed\r\n")
        .write(b"K0003 UID FETCH 42 (UID BODY.PEEK[])\r\n")
        .read(fetch_reply.as_bytes())
        .read(RAW_MESSAGE)
        .read(b")\r\n")
        .read(b"K0003 OK FETCH completed\r\n")
        .write(b"K0004 LOGOUT\r\n")
        .read(b"* BYE logging out\r\n")
        .read(b"K0004 OK LOGOUT completed\r\n")
        .build();

    let client = Client::from_stream(mock).await.unwrap();
    let client = client.login("user@example.com", "secret").await.unwrap();
    let mut client = client.select("INBOX").await.unwrap();

    let floor = NaiveDate::from_ymd_opt(2026, 8, 5).unwrap();
    let uids = client.uid_search_since(floor).await.unwrap();
    assert_eq!(uids, vec![Uid(42)]);

    let body = client.uid_fetch_body(Uid(42)).await.unwrap().unwrap();
    assert_eq!(body, RAW_MESSAGE);

    client.logout().await.unwrap();
}

#[tokio::test]
async fn fetch_of_expunged_message_is_none() {
    let mock = Builder::new()
        .read(b"* OK ready\r\n")
        .write(b"K0000 LOGIN \"u\" \"p\"\r\n")
        .read(b"K0000 OK\r\n")
        .write(b"K0001 SELECT \"INBOX\"\r\n")
        .read(b"K0001 OK\r\n")
        .write(b"K0002 UID FETCH 7 (UID BODY.PEEK[])\r\n")
        .read(b"K0002 OK FETCH completed\r\n")
        .build();

    let client = Client::from_stream(mock).await.unwrap();
    let client = client.login("u", "p").await.unwrap();
    let mut client = client.select("INBOX").await.unwrap();

    assert!(client.uid_fetch_body(Uid(7)).await.unwrap().is_none());
}
