//! CSV export of stored posts with the Korean column headers used by the
//! spreadsheets downstream.

use std::io::Write;

use crate::db::PostRow;
use crate::error::Result;

pub const HEADERS: [&str; 12] = [
    "플랫폼명", "게시글_ID", "가격", "URL", "모델명", "제목", "용량", "시도", "시군구", "동읍면", "색상",
    "작성일",
];

/// Write rows as UTF-8 CSV with a BOM so spreadsheet apps detect the encoding
pub fn write_csv<W: Write>(mut out: W, rows: &[PostRow]) -> Result<()> {
    out.write_all(b"\xEF\xBB\xBF")?;
    let mut writer = csv::Writer::from_writer(out);
    writer.write_record(HEADERS)?;
    for row in rows {
        let price = row.price.to_string();
        writer.write_record([
            row.platform.as_str(),
            row.post_id.as_str(),
            price.as_str(),
            row.url.as_str(),
            row.model.as_str(),
            row.title.as_str(),
            row.storage.as_str(),
            row.sido.as_str(),
            row.sigungu.as_str(),
            row.dong.as_str(),
            row.color.as_str(),
            row.posted_date.as_deref().unwrap_or(""),
        ])?;
    }
    writer.flush()?;
    Ok(())
}
