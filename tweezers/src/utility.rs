use std::{
    fs::{File, create_dir_all},
    io::{Error, ErrorKind, Write},
    path::{Path, PathBuf},
};

use serde::Serialize;

fn data_path(filename: &str, extension: &str) -> Result<PathBuf, Error> {
    let mut path = std::env::current_dir()?;
    path.push("data");
    path.push(filename);
    path.set_extension(extension);

    Ok(path)
}

fn write_file(path: &Path, contents: &str) -> Result<(), Error> {
    if let Some(directory) = path.parent() {
        if !directory.exists() {
            create_dir_all(directory)?;
            tracing::info!("created path {}", directory.display());
        }
    }

    let mut file = File::create(path)?;
    file.write_all(contents.as_bytes())?;

    tracing::info!("saved data on {}", path.display());
    Ok(())
}

/// Tab separated columns under `data/<filename>.dat` in the working directory.
pub fn save_data(filename: &str, header: &str, data: &[Vec<f64>]) -> Result<(), Error> {
    write_file(&data_path(filename, "dat")?, &format_columns(header, data)?)
}

pub fn save_serialize(filename: &str, data: &impl Serialize) -> Result<(), Error> {
    let contents = serde_json::to_string(data).map_err(Error::other)?;

    write_file(&data_path(filename, "json")?, &contents)
}

fn format_columns(header: &str, data: &[Vec<f64>]) -> Result<String, Error> {
    let n = data.first().map_or(0, |c| c.len());
    if data.iter().any(|values| values.len() != n) {
        return Err(Error::new(ErrorKind::InvalidInput, "columns of different length"));
    }

    let mut buf = header.to_string();
    for i in 0..n {
        let line = data
            .iter()
            .fold(String::new(), |s, val| s + &format!("\t{:e}", val[i]));

        buf.push_str(&format!("\n{}", line.trim()));
    }

    Ok(buf)
}

#[cfg(test)]
mod test {
    use super::format_columns;

    #[test]
    fn test_format_columns() {
        let text = format_columns("x\ty", &[vec![1., 2.], vec![0.5, -3.]]).unwrap();
        assert_eq!(text, "x\ty\n1e0\t5e-1\n2e0\t-3e0");

        assert!(format_columns("", &[vec![1.], vec![]]).is_err());
    }
}
