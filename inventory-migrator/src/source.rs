use std::{collections::BTreeMap, fs, path::Path};

use crate::error::{MigrateError, Result};

/// One rung of a ladder read from a directory of SQL files.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MigrationScript {
    pub version: u32,
    pub name: String,
    pub up: String,
    pub down: String,
}

#[derive(Default)]
struct PartialScript {
    name: String,
    up: Option<String>,
    down: Option<String>,
}

/// Reads `<version>_<name>.up.sql` and `<version>_<name>.down.sql` pairs from
/// `path`, sorted by version. Files with other extensions are skipped.
pub fn read_dir(path: impl AsRef<Path>) -> Result<Vec<MigrationScript>> {
    let mut scripts: BTreeMap<u32, PartialScript> = BTreeMap::new();

    for entry in fs::read_dir(path.as_ref())? {
        let entry = entry?;

        if !entry.file_type()?.is_file() {
            continue;
        }

        let file_name = entry.file_name();
        let Some(file_name) = file_name.to_str() else {
            continue;
        };

        let Some((version, name, up)) = parse_file_name(file_name)? else {
            continue;
        };

        let sql = fs::read_to_string(entry.path())?;
        let script = scripts.entry(version).or_insert_with(|| PartialScript {
            name: name.to_owned(),
            ..PartialScript::default()
        });

        if script.name != name {
            return Err(MigrateError::InvalidSource(format!(
                "version {version} is used by `{}` and `{name}`",
                script.name
            )));
        }

        let slot = if up { &mut script.up } else { &mut script.down };

        if slot.replace(sql).is_some() {
            return Err(MigrateError::InvalidSource(format!(
                "duplicate migration file `{file_name}`"
            )));
        }
    }

    scripts
        .into_iter()
        .map(|(version, script)| match (script.up, script.down) {
            (Some(up), Some(down)) => Ok(MigrationScript {
                version,
                name: script.name,
                up,
                down,
            }),
            (None, _) => Err(MigrateError::InvalidSource(format!(
                "missing up migration for version {version}"
            ))),
            (_, None) => Err(MigrateError::InvalidSource(format!(
                "missing down migration for version {version}"
            ))),
        })
        .collect()
}

fn parse_file_name(file_name: &str) -> Result<Option<(u32, &str, bool)>> {
    let (stem, up) = if let Some(stem) = file_name.strip_suffix(".up.sql") {
        (stem, true)
    } else if let Some(stem) = file_name.strip_suffix(".down.sql") {
        (stem, false)
    } else {
        return Ok(None);
    };

    let Some((version, name)) = stem.split_once('_') else {
        return Err(MigrateError::InvalidSource(format!(
            "`{file_name}` does not start with `<version>_`"
        )));
    };

    let version = version.parse::<u32>().map_err(|_| {
        MigrateError::InvalidSource(format!("`{file_name}` has an invalid version"))
    })?;

    if version == 0 {
        return Err(MigrateError::InvalidSource(format!(
            "`{file_name}` uses reserved version 0"
        )));
    }

    Ok(Some((version, name, up)))
}
