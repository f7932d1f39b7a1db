//! Response routing: turn a finished reply into a typed outcome
//!
//! Failures (transport errors and non-2xx replies) are reported as-is with no
//! per-kind parsing. Successful replies are parsed according to the operation
//! kind recorded when the request was issued.

use chrono::{DateTime, TimeZone, Utc};
use tokio::sync::mpsc::UnboundedSender;
use tracing::{debug, warn};

use crate::upyun::dispatcher::InFlightTable;
use crate::upyun::error::{Result, UpYunError};
use crate::upyun::transport::RawResponse;
use crate::upyun::types::{Completion, FileInfo, ItemInfo, OperationKind, Outcome, PicInfo, RequestId};

pub const PIC_TYPE: &str = "x-upyun-file-type";
pub const PIC_WIDTH: &str = "x-upyun-width";
pub const PIC_HEIGHT: &str = "x-upyun-height";
pub const PIC_FRAMES: &str = "x-upyun-frames";

pub const FILE_TYPE: &str = "x-upyun-file-type";
pub const FILE_SIZE: &str = "x-upyun-file-size";
pub const FILE_DATE: &str = "x-upyun-file-date";

/// Route the result of request `id` and deliver its completion
///
/// Does nothing if `id` is not in flight, so a request completes at most once.
pub(crate) fn complete(
    table: &InFlightTable,
    tx: &UnboundedSender<Completion>,
    id: RequestId,
    result: Result<RawResponse>,
) {
    let Some(kind) = table.kind_of(id) else {
        warn!(request_id = %id, "completion for unknown request dropped");
        return;
    };

    let outcome = route(kind, result);
    match &outcome {
        Ok(_) => debug!(request_id = %id, kind = %kind, "request finished"),
        Err(e) => warn!(request_id = %id, kind = %kind, code = e.code(), error = %e, "request failed"),
    }

    table.finish(id, || {
        // The receiver lives in the client; if it is gone nobody is listening
        let _ = tx.send(Completion { id, kind, outcome });
    });
}

/// Map a transport result to the outcome for `kind`
pub fn route(kind: OperationKind, result: Result<RawResponse>) -> Result<Outcome> {
    let response = result?;
    debug!(
        kind = %kind,
        status = response.status.as_u16(),
        body_len = response.body.len(),
        "response received"
    );

    if !response.status.is_success() {
        return Err(UpYunError::from_status(response.status, &response.body));
    }

    let empty = response.body.is_empty();
    let outcome = match kind {
        OperationKind::BucketUsage => Outcome::BucketUsage(parse_usage(&response.body)?),
        OperationKind::MakeDir => Outcome::MakeDir(empty),
        OperationKind::RemoveDir => Outcome::RemoveDir(empty),
        OperationKind::RemoveFile => Outcome::RemoveFile(empty),
        OperationKind::Upload => Outcome::Upload {
            success: empty,
            pic: pic_info(&response),
        },
        OperationKind::List => Outcome::List(parse_listing(&response.body)?),
        OperationKind::Download => Outcome::Download(response.body),
        OperationKind::Stat => Outcome::Stat(file_info(&response)),
    };
    Ok(outcome)
}

/// Bucket usage body: a bare decimal byte count
pub fn parse_usage(body: &[u8]) -> Result<u64> {
    let text = std::str::from_utf8(body)
        .map_err(|e| UpYunError::Protocol(format!("usage body is not UTF-8: {}", e)))?;
    text.trim()
        .parse()
        .map_err(|_| UpYunError::Protocol(format!("usage body is not an integer: {:?}", text)))
}

/// Directory listing body: `name\ttype\tsize\tmtime` per line
///
/// Empty lines are skipped; any other line must have exactly four fields.
pub fn parse_listing(body: &[u8]) -> Result<Vec<ItemInfo>> {
    let text = std::str::from_utf8(body)
        .map_err(|e| UpYunError::Protocol(format!("listing is not UTF-8: {}", e)))?;

    let mut items = Vec::new();
    for (index, line) in text.split('\n').enumerate() {
        let line = line.strip_suffix('\r').unwrap_or(line);
        if line.is_empty() {
            continue;
        }

        let fields: Vec<&str> = line.split('\t').collect();
        if fields.len() != 4 {
            return Err(UpYunError::Protocol(format!(
                "listing line {} has {} fields, expected 4: {:?}",
                index + 1,
                fields.len(),
                line
            )));
        }

        let size = fields[2].trim().parse::<u64>().map_err(|_| {
            UpYunError::Protocol(format!("listing line {} has invalid size {:?}", index + 1, fields[2]))
        })?;
        let modified_at = fields[3]
            .trim()
            .parse::<i64>()
            .ok()
            .and_then(epoch)
            .ok_or_else(|| {
                UpYunError::Protocol(format!("listing line {} has invalid time {:?}", index + 1, fields[3]))
            })?;

        items.push(ItemInfo {
            name: fields[0].to_string(),
            is_folder: fields[1].eq_ignore_ascii_case("F"),
            size,
            modified_at,
        });
    }

    Ok(items)
}

/// Picture metadata from upload reply headers
pub fn pic_info(response: &RawResponse) -> PicInfo {
    PicInfo {
        format: response.header_str(PIC_TYPE).unwrap_or_default().to_string(),
        width: header_u64(response, PIC_WIDTH),
        height: header_u64(response, PIC_HEIGHT),
        frames: header_u64(response, PIC_FRAMES),
    }
}

/// File metadata from stat reply headers
pub fn file_info(response: &RawResponse) -> FileInfo {
    FileInfo {
        kind: response.header_str(FILE_TYPE).unwrap_or_default().to_string(),
        size: header_u64(response, FILE_SIZE),
        created_at: i64::try_from(header_u64(response, FILE_DATE))
            .ok()
            .and_then(epoch)
            .unwrap_or_default(),
    }
}

/// Unsigned header value, 0 when absent or unparseable
fn header_u64(response: &RawResponse, name: &str) -> u64 {
    response
        .header_str(name)
        .and_then(|v| v.trim().parse().ok())
        .unwrap_or(0)
}

fn epoch(secs: i64) -> Option<DateTime<Utc>> {
    Utc.timestamp_opt(secs, 0).single()
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::Bytes;
    use hyper::StatusCode;

    fn ok(body: &'static str) -> Result<RawResponse> {
        Ok(RawResponse::new(StatusCode::OK, body))
    }

    fn with_headers(body: &'static str, headers: &[(&'static str, &'static str)]) -> RawResponse {
        let mut response = RawResponse::new(StatusCode::OK, body);
        for (name, value) in headers {
            response.headers.insert(*name, value.parse().unwrap());
        }
        response
    }

    #[test]
    fn test_usage() {
        assert_eq!(
            route(OperationKind::BucketUsage, ok("12345")).unwrap(),
            Outcome::BucketUsage(12345)
        );
        assert_eq!(parse_usage(b"42\n").unwrap(), 42);
        assert!(matches!(parse_usage(b"lots"), Err(UpYunError::Protocol(_))));
    }

    #[test]
    fn test_listing() {
        let items = parse_listing(b"a.txt\tN\t10\t0\nsub\tF\t0\t0\n").unwrap();
        assert_eq!(
            items,
            vec![
                ItemInfo {
                    name: "a.txt".to_string(),
                    is_folder: false,
                    size: 10,
                    modified_at: epoch(0).unwrap(),
                },
                ItemInfo {
                    name: "sub".to_string(),
                    is_folder: true,
                    size: 0,
                    modified_at: epoch(0).unwrap(),
                },
            ]
        );
    }

    #[test]
    fn test_listing_folder_flag_case_insensitive() {
        let items = parse_listing(b"photos\tf\t0\t1381306960").unwrap();
        assert!(items[0].is_folder);
        assert_eq!(items[0].modified_at.timestamp(), 1381306960);
    }

    #[test]
    fn test_empty_listing() {
        assert!(parse_listing(b"").unwrap().is_empty());
        assert!(parse_listing(b"\n\n").unwrap().is_empty());
    }

    #[test]
    fn test_short_listing_line_is_protocol_error() {
        let err = parse_listing(b"a.txt\tN\t10\t0\nbroken\tN\n").unwrap_err();
        match err {
            UpYunError::Protocol(msg) => assert!(msg.contains("line 2"), "{msg}"),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_bad_listing_numbers_are_protocol_errors() {
        assert!(matches!(parse_listing(b"a\tN\tten\t0"), Err(UpYunError::Protocol(_))));
        assert!(matches!(parse_listing(b"a\tN\t1\tyesterday"), Err(UpYunError::Protocol(_))));
    }

    #[test]
    fn test_mutations_succeed_on_empty_body() {
        assert_eq!(route(OperationKind::MakeDir, ok("")).unwrap(), Outcome::MakeDir(true));
        assert_eq!(route(OperationKind::RemoveDir, ok("")).unwrap(), Outcome::RemoveDir(true));
        assert_eq!(route(OperationKind::RemoveFile, ok("x")).unwrap(), Outcome::RemoveFile(false));
    }

    #[test]
    fn test_upload_pic_info() {
        let response = with_headers(
            "",
            &[
                (PIC_TYPE, "jpg"),
                (PIC_WIDTH, "100"),
                (PIC_HEIGHT, "50"),
                (PIC_FRAMES, "1"),
            ],
        );
        assert_eq!(
            route(OperationKind::Upload, Ok(response)).unwrap(),
            Outcome::Upload {
                success: true,
                pic: PicInfo {
                    format: "jpg".to_string(),
                    width: 100,
                    height: 50,
                    frames: 1,
                },
            }
        );
    }

    #[test]
    fn test_upload_without_headers_defaults_to_zero() {
        let response = with_headers("", &[(PIC_WIDTH, "wide")]);
        assert_eq!(pic_info(&response), PicInfo::default());
    }

    #[test]
    fn test_download_returns_body_verbatim() {
        let body = Bytes::from_static(b"\x00\x01binary\n");
        let response = RawResponse::new(StatusCode::OK, body.clone());
        assert_eq!(route(OperationKind::Download, Ok(response)).unwrap(), Outcome::Download(body));
    }

    #[test]
    fn test_stat_file_info() {
        let response = with_headers(
            "",
            &[(FILE_TYPE, "file"), (FILE_SIZE, "2048"), (FILE_DATE, "1381306960")],
        );
        let info = file_info(&response);
        assert_eq!(info.kind, "file");
        assert_eq!(info.size, 2048);
        assert_eq!(info.created_at.timestamp(), 1381306960);

        let bare = file_info(&RawResponse::new(StatusCode::OK, ""));
        assert_eq!(bare, FileInfo::default());
    }

    #[test]
    fn test_stat_date_out_of_range_is_epoch() {
        let response = with_headers("", &[(FILE_SIZE, "5"), (FILE_DATE, "18446744073709551615")]);
        let info = file_info(&response);
        assert_eq!(info.size, 5);
        assert_eq!(info.created_at.timestamp(), 0);

        let response = with_headers("", &[(FILE_DATE, "9223372036854775807")]);
        assert_eq!(file_info(&response).created_at.timestamp(), 0);
    }

    #[test]
    fn test_failure_skips_parsing() {
        let response = RawResponse::new(StatusCode::NOT_FOUND, "file not found");
        let err = route(OperationKind::List, Ok(response)).unwrap_err();
        assert_eq!(err.code(), 404);

        let err = route(OperationKind::Stat, Err(UpYunError::Transport("refused".to_string())))
            .unwrap_err();
        assert!(matches!(err, UpYunError::Transport(_)));
    }

    #[tokio::test]
    async fn test_complete_removes_entry_and_delivers_once() {
        let table = InFlightTable::new();
        let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel();
        let id = RequestId(3);
        table.insert(id, OperationKind::RemoveFile);

        complete(&table, &tx, id, Err(UpYunError::Transport("reset".to_string())));
        complete(&table, &tx, id, ok(""));

        let completion = rx.recv().await.unwrap();
        assert_eq!(completion.id, id);
        assert_eq!(completion.kind, OperationKind::RemoveFile);
        assert!(completion.outcome.is_err());
        assert!(rx.try_recv().is_err());
        assert!(table.is_empty());
    }
}
