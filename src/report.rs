use std::collections::BTreeMap;

use csv::WriterBuilder;

use crate::models::PersonAggregate;

pub const OUTPUT_DELIMITER: u8 = b'#';

pub fn build_table(
    segment_names: &[String],
    standings: &BTreeMap<String, PersonAggregate>,
    score: bool,
) -> anyhow::Result<String> {
    let mut writer = WriterBuilder::new()
        .delimiter(OUTPUT_DELIMITER)
        .flexible(false)
        .from_writer(Vec::new());

    let mut header = vec!["Name".to_string()];
    header.extend(segment_names.iter().cloned());
    header.push("Total Time".to_string());
    if score {
        header.push("Rank Avg".to_string());
    }
    writer.write_record(&header)?;

    for (name, person) in standings {
        let mut line = vec![name.clone()];
        for segment in segment_names {
            let time = person
                .per_segment
                .get(segment)
                .map(|split| split.time_label())
                .unwrap_or_else(|| crate::NOT_AVAILABLE.to_string());
            line.push(time);
        }
        line.push(person.total_time.to_string());
        if score {
            line.push(format!("{:.2}", person.rank_avg));
        }
        writer.write_record(&line)?;
    }

    let bytes = writer.into_inner().map_err(|err| err.into_error())?;
    Ok(String::from_utf8(bytes)?)
}
