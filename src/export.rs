// CSV export boundary. Consumers expect this exact column order; the BOM
// keeps Excel happy with UTF-8 Chinese content.

use std::path::Path;

use crate::error::AppError;
use crate::models::posting::JobPosting;

const HEADERS: [&str; 11] = [
    "公司名稱",
    "職缺標題",
    "薪資範圍",
    "地點",
    "經驗要求",
    "工作內容",
    "聯絡人",
    "聯絡電話",
    "聯絡信箱",
    "連結",
    "更新日期",
];

pub fn write_csv(path: &Path, postings: &[JobPosting]) -> Result<(), AppError> {
    let mut rows = Vec::with_capacity(postings.len() + 1);
    rows.push(HEADERS.join(","));

    for p in postings {
        let fields = [
            &p.company,
            &p.title,
            &p.salary_range,
            &p.location,
            &p.experience,
            &p.description,
            &p.contact_person,
            &p.contact_phone,
            &p.contact_email,
            &p.link,
            &p.last_updated,
        ];
        let row = fields.map(|f| quote(f)).join(",");
        rows.push(row);
    }

    if let Some(dir) = path.parent()
        && !dir.as_os_str().is_empty()
    {
        std::fs::create_dir_all(dir)?;
    }
    std::fs::write(path, format!("\u{FEFF}{}", rows.join("\n")))?;
    Ok(())
}

fn quote(field: &str) -> String {
    format!("\"{}\"", field.replace('"', "\"\""))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::posting::SourcePlatform;

    #[test]
    fn writes_bom_header_and_quoted_fields() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.csv");

        let mut p = JobPosting::new(
            SourcePlatform::Tw104,
            "甲公司".into(),
            "資深 \"全端\" 工程師".into(),
        );
        p.salary_range = "月薪50,000~70,000元".into();
        write_csv(&path, &[p]).unwrap();

        let content = std::fs::read_to_string(&path).unwrap();
        assert!(content.starts_with('\u{FEFF}'));

        let mut lines = content.trim_start_matches('\u{FEFF}').lines();
        assert!(lines.next().unwrap().starts_with("公司名稱,職缺標題"));

        let row = lines.next().unwrap();
        assert!(row.contains(r#""資深 ""全端"" 工程師""#));
        // Comma-grouped salary stays one quoted field.
        assert!(row.contains(r#""月薪50,000~70,000元""#));
    }
}
