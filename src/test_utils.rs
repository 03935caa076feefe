use std::path::{Path, PathBuf};

use anyhow::{bail, Context};
use itertools::Itertools;
use serde::{de::{Error, MapAccess, Visitor}, Deserialize, Deserializer};

use crate::error::ErrorKind;

/// What running one test program should produce: the printed lines, then
/// either success or an error of the given kind.
#[derive(Debug, Clone, PartialEq)]
pub struct Expectation {
    pub output: Vec<String>,
    pub error: Option<ErrorKind>,
}

struct ExpectationVisitor {}

impl<'de> Deserialize<'de> for Expectation {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
        where
            D: Deserializer<'de> {

        deserializer.deserialize_map(ExpectationVisitor {})
    }
}

impl<'de> Visitor<'de> for ExpectationVisitor {
    type Value = Expectation;

    fn expecting(&self, formatter: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(formatter, "A structure containing the boolean key 'ok' and the list 'output'. If it's not okay, also the key 'type'")
    }

    fn visit_map<A>(self, mut map: A) -> Result<Self::Value, A::Error>
        where
            A: MapAccess<'de>, {

        let mut ok: Option<bool> = None;
        let mut output: Option<Vec<String>> = None;
        let mut error: Option<ErrorKind> = None;

        while let Some(key) = map.next_key::<String>()? {
            match key.as_str() {
                "ok" => ok = Some(map.next_value()?),
                "output" => output = Some(map.next_value()?),
                "type" => error = Some(map.next_value()?),
                other => return Err(A::Error::custom(format!("Unrecognized key: {}", other))),
            }
        }

        let ok = ok.ok_or_else(|| A::Error::missing_field("ok"))?;
        let output = output.unwrap_or_default();
        match (ok, error) {
            (true, None) => Ok(Expectation { output, error: None }),
            (false, Some(kind)) => Ok(Expectation { output, error: Some(kind) }),
            (true, Some(_)) => Err(A::Error::custom("A passing case cannot name an error 'type'")),
            (false, None) => Err(A::Error::missing_field("type")),
        }
    }
}

fn base_path() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
}

fn load_output_file<P: AsRef<Path>>(path: P) -> anyhow::Result<Expectation> {
    let source = std::fs::read(path.as_ref())
        .with_context(|| format!("reading {}", path.as_ref().display()))?;
    Ok(serde_json::from_slice(&source)?)
}

pub fn load_test_pair(testcase: &str) -> anyhow::Result<(String, Expectation)> {
    let input_path = base_path().join("test_inputs").join(format!("{}.lox", testcase));
    let input = std::fs::read_to_string(&input_path)
        .with_context(|| format!("reading {}", input_path.display()))?;
    let output = load_output_file(base_path().join("test_outputs").join(format!("{}.json", testcase)))?;

    Ok((input, output))
}

/// Names of every program under `test_inputs/`, sorted.
pub fn all_testcases() -> anyhow::Result<Vec<String>> {
    let testcases = std::fs::read_dir(base_path().join("test_inputs"))?
        .map(|entry| entry.map(|entry| entry.path()))
        .collect::<Result<Vec<_>, _>>()?
        .into_iter()
        .filter(|path| path.extension().is_some_and(|extension| extension == "lox"))
        .filter_map(|path| path.file_stem().map(|stem| stem.to_string_lossy().into_owned()))
        .sorted()
        .collect_vec();

    if testcases.is_empty() { bail!("No testcases found in test_inputs"); }
    Ok(testcases)
}
