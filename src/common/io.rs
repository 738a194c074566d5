//! Common, IO-related code.

use std::{
    fs::File,
    io::{BufRead, BufReader, BufWriter, Write},
    path::Path,
};

use flate2::{bufread::MultiGzDecoder, write::GzEncoder, Compression};

/// Transparently open a file with gzip decoder.
pub fn open_read_maybe_gz<P>(path: P) -> Result<Box<dyn BufRead>, anyhow::Error>
where
    P: AsRef<Path>,
{
    if path.as_ref().extension().map(|s| s.to_str()) == Some(Some("gz")) {
        tracing::trace!("opening {:?} as gzip for reading", path.as_ref());
        let file = File::open(path)?;
        let decoder = MultiGzDecoder::new(BufReader::new(file));
        Ok(Box::new(BufReader::new(decoder)))
    } else {
        tracing::trace!("opening {:?} as plain text for reading", path.as_ref());
        let file = File::open(path).map(BufReader::new)?;
        Ok(Box::new(file))
    }
}

/// Transparently open a file with gzip encoder.
pub fn open_write_maybe_gz<P>(path: P) -> Result<Box<dyn Write>, anyhow::Error>
where
    P: AsRef<Path>,
{
    if path.as_ref().extension().map(|s| s.to_str()) == Some(Some("gz")) {
        tracing::trace!("opening {:?} as gzip for writing", path.as_ref());
        let file = File::create(path)?;
        let encoder = GzEncoder::new(BufWriter::new(file), Compression::default());
        Ok(Box::new(encoder))
    } else {
        tracing::trace!("opening {:?} as plain text for writing", path.as_ref());
        let file = File::create(path)?;
        Ok(Box::new(BufWriter::new(file)))
    }
}

/// Return an iterator over the lines of the file at `filename`.
pub fn read_lines<P>(filename: P) -> std::io::Result<std::io::Lines<BufReader<File>>>
where
    P: AsRef<Path>,
{
    let file = File::open(filename)?;
    Ok(BufReader::new(file).lines())
}

/// Expand a list of input paths: `~` is resolved and an `@file` entry is
/// replaced by the non-empty lines of that file.
pub fn expand_input_paths(paths: &[String]) -> Result<Vec<String>, anyhow::Error> {
    let mut result = Vec::new();
    for path in paths {
        if let Some(path) = path.strip_prefix('@') {
            let path = shellexpand::tilde(path);
            for line in read_lines(path.into_owned())? {
                let line = line?;
                if !line.trim().is_empty() {
                    result.push(line.trim().to_owned());
                }
            }
        } else {
            result.push(shellexpand::tilde(path).into_owned());
        }
    }
    Ok(result)
}

/// Normalize a header cell: whitespace trimmed, leading `#` removed.
pub fn clean_header(name: &str) -> String {
    name.trim().trim_start_matches('#').trim().to_string()
}

/// Tab-separated reader with headers over a maybe-gzipped file.
pub fn tsv_reader<P>(path: P) -> Result<csv::Reader<Box<dyn BufRead>>, anyhow::Error>
where
    P: AsRef<Path>,
{
    Ok(csv::ReaderBuilder::new()
        .has_headers(true)
        .delimiter(b'\t')
        .flexible(true)
        .from_reader(open_read_maybe_gz(path)?))
}

/// Tab-separated writer without automatic headers over a maybe-gzipped file.
pub fn tsv_writer<P>(path: P) -> Result<csv::Writer<Box<dyn Write>>, anyhow::Error>
where
    P: AsRef<Path>,
{
    Ok(csv::WriterBuilder::new()
        .delimiter(b'\t')
        .has_headers(false)
        .from_writer(open_write_maybe_gz(path)?))
}
