//! DNA files and generation snapshots on disk

use std::fmt;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use ahash::HashSet;
use anyhow::{bail, Context, Result};
use morphogen_creature::Dna;

use crate::generation::EvolutionGeneration;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum WriteMode {
    #[default]
    Append,
    Overwrite,
}

impl WriteMode {
    pub fn name(&self) -> &'static str {
        match self {
            WriteMode::Append => "append",
            WriteMode::Overwrite => "overwrite",
        }
    }
}

impl fmt::Display for WriteMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

impl FromStr for WriteMode {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "append" => Ok(WriteMode::Append),
            "overwrite" => Ok(WriteMode::Overwrite),
            other => bail!("Unknown write mode '{}', expected append or overwrite", other),
        }
    }
}

/// One `<species>.dna` file per species, one strand per line
#[derive(Debug, Clone)]
pub struct DnaRepository {
    folder: PathBuf,
}

impl DnaRepository {
    pub fn new(folder: impl Into<PathBuf>) -> Self {
        Self {
            folder: folder.into(),
        }
    }

    pub fn folder(&self) -> &Path {
        &self.folder
    }

    pub fn path_for(&self, species: &str) -> PathBuf {
        self.folder.join(format!("{}.dna", species))
    }

    pub fn write(&self, species: &str, dna: &Dna, mode: WriteMode) -> Result<PathBuf> {
        fs::create_dir_all(&self.folder)
            .with_context(|| format!("Failed to create {}", self.folder.display()))?;

        let path = self.path_for(species);
        let mut file = fs::OpenOptions::new()
            .create(true)
            .write(true)
            .append(mode == WriteMode::Append)
            .truncate(mode == WriteMode::Overwrite)
            .open(&path)
            .with_context(|| format!("Failed to open {}", path.display()))?;
        writeln!(file, "{}", dna).with_context(|| format!("Failed to write {}", path.display()))?;

        log::info!("Wrote {} DNA ({} mode) to {}", species, mode, path.display());
        Ok(path)
    }

    /// The `individual`-th strand, counting non-blank lines from zero
    pub fn read(&self, species: &str, individual: usize) -> Result<Option<Dna>> {
        let lines = self.lines(species)?;
        lines
            .get(individual)
            .map(|line| parse_line(species, line))
            .transpose()
    }

    pub fn read_all(&self, species: &str) -> Result<Vec<Dna>> {
        self.lines(species)?
            .iter()
            .map(|line| parse_line(species, line))
            .collect()
    }

    /// Drop repeated lines, keeping first occurrences. Returns how many
    /// were removed.
    pub fn dedup(&self, species: &str) -> Result<usize> {
        let lines = self.lines(species)?;
        let mut seen: HashSet<&str> = HashSet::default();
        let unique: Vec<&str> = lines
            .iter()
            .map(String::as_str)
            .filter(|line| seen.insert(*line))
            .collect();
        let removed = lines.len() - unique.len();

        let path = self.path_for(species);
        let mut contents = unique.join("\n");
        if !contents.is_empty() {
            contents.push('\n');
        }
        fs::write(&path, contents).with_context(|| format!("Failed to write {}", path.display()))?;

        log::info!("Removed {} duplicate {} strands", removed, species);
        Ok(removed)
    }

    fn lines(&self, species: &str) -> Result<Vec<String>> {
        let path = self.path_for(species);
        let contents = fs::read_to_string(&path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        Ok(contents
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .map(str::to_string)
            .collect())
    }
}

fn parse_line(species: &str, line: &str) -> Result<Dna> {
    line.parse::<Dna>()
        .with_context(|| format!("Malformed {} DNA line", species))
}

/// `generation-<id>.json` snapshots in one folder
#[derive(Debug, Clone)]
pub struct GenerationRepository {
    folder: PathBuf,
}

impl GenerationRepository {
    const PREFIX: &'static str = "generation-";
    const EXTENSION: &'static str = "json";

    pub fn new(folder: impl Into<PathBuf>) -> Self {
        Self {
            folder: folder.into(),
        }
    }

    pub fn folder(&self) -> &Path {
        &self.folder
    }

    pub fn path_for(&self, generation_id: u64) -> PathBuf {
        self.folder
            .join(format!("{}{:06}.{}", Self::PREFIX, generation_id, Self::EXTENSION))
    }

    pub fn save(&self, generation: &EvolutionGeneration) -> Result<PathBuf> {
        fs::create_dir_all(&self.folder)
            .with_context(|| format!("Failed to create {}", self.folder.display()))?;

        let path = self.path_for(generation.generation_id);
        let json = serde_json::to_string_pretty(generation)
            .context("Failed to serialize generation")?;
        fs::write(&path, json).with_context(|| format!("Failed to write {}", path.display()))?;

        log::info!(
            "Saved generation {} to {}",
            generation.generation_id,
            path.display()
        );
        Ok(path)
    }

    pub fn load(&self, generation_id: u64) -> Result<EvolutionGeneration> {
        let path = self.path_for(generation_id);
        let json = fs::read_to_string(&path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        serde_json::from_str(&json).with_context(|| format!("Failed to parse {}", path.display()))
    }

    /// Ids of all snapshots in the folder, ascending
    pub fn generation_ids(&self) -> Result<Vec<u64>> {
        if !self.folder.exists() {
            return Ok(Vec::new());
        }

        let entries = fs::read_dir(&self.folder)
            .with_context(|| format!("Failed to list {}", self.folder.display()))?;
        let mut ids = Vec::new();
        for entry in entries {
            let path = entry?.path();
            if let Some(id) = Self::parse_id(&path) {
                ids.push(id);
            }
        }
        ids.sort_unstable();
        Ok(ids)
    }

    /// Highest-numbered snapshot, `None` when there is none
    pub fn latest(&self) -> Result<Option<EvolutionGeneration>> {
        match self.generation_ids()?.last() {
            Some(&id) => self.load(id).map(Some),
            None => Ok(None),
        }
    }

    fn parse_id(path: &Path) -> Option<u64> {
        if path.extension()? != Self::EXTENSION {
            return None;
        }
        path.file_stem()?
            .to_str()?
            .strip_prefix(Self::PREFIX)?
            .parse()
            .ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::generation::EvolutionRecord;
    use crate::hyperparams::Hyperparams;
    use crate::metrics::EvolutionMetrics;
    use chrono::Utc;
    use morphogen_creature::GENE_LENGTH;
    use tempfile::TempDir;

    fn dna(fill: f64) -> Dna {
        Dna::parse(vec![fill; GENE_LENGTH]).unwrap()
    }

    fn snapshot(generation_id: u64) -> EvolutionGeneration {
        let record = EvolutionRecord {
            name: "gen0-0".to_string(),
            dna_code: dna(0.6).to_string(),
            fitness: 1.25,
            lethal: false,
            gene_count: 1,
            expressed_gene_count: 1,
            steps_tracked: 10,
            interrupted: false,
        };
        EvolutionGeneration {
            generation_id,
            created_at: Utc::now(),
            hyperparams: Hyperparams::default(),
            elite_previous: None,
            elite_offspring: record.clone(),
            metrics: EvolutionMetrics::from_records(std::slice::from_ref(&record)),
            offspring: vec![record],
            interrupted: false,
        }
    }

    #[test]
    fn test_write_mode_parsing() {
        assert_eq!("append".parse::<WriteMode>().unwrap(), WriteMode::Append);
        assert_eq!("Overwrite".parse::<WriteMode>().unwrap(), WriteMode::Overwrite);
        assert!("replace".parse::<WriteMode>().is_err());
        assert_eq!(WriteMode::default().to_string(), "append");
    }

    #[test]
    fn test_append_and_read() {
        let dir = TempDir::new().unwrap();
        let repo = DnaRepository::new(dir.path().join("robots"));

        repo.write("ant", &dna(0.6), WriteMode::Append).unwrap();
        repo.write("ant", &dna(0.7), WriteMode::Append).unwrap();

        assert_eq!(repo.read("ant", 0).unwrap(), Some(dna(0.6)));
        assert_eq!(repo.read("ant", 1).unwrap(), Some(dna(0.7)));
        assert_eq!(repo.read("ant", 2).unwrap(), None);
        assert_eq!(repo.read_all("ant").unwrap().len(), 2);
    }

    #[test]
    fn test_overwrite_replaces() {
        let dir = TempDir::new().unwrap();
        let repo = DnaRepository::new(dir.path());

        repo.write("ant", &dna(0.6), WriteMode::Append).unwrap();
        repo.write("ant", &dna(0.7), WriteMode::Overwrite).unwrap();
        assert_eq!(repo.read_all("ant").unwrap(), vec![dna(0.7)]);
    }

    #[test]
    fn test_blank_lines_skipped() {
        let dir = TempDir::new().unwrap();
        let repo = DnaRepository::new(dir.path());
        fs::write(repo.path_for("ant"), format!("\n{}\n\n  \n{}\n", dna(0.6), dna(0.7))).unwrap();

        assert_eq!(repo.read("ant", 1).unwrap(), Some(dna(0.7)));
    }

    #[test]
    fn test_malformed_line_fails() {
        let dir = TempDir::new().unwrap();
        let repo = DnaRepository::new(dir.path());
        fs::write(repo.path_for("ant"), "0.1,zebra\n").unwrap();
        assert!(repo.read_all("ant").is_err());
    }

    #[test]
    fn test_missing_species_fails() {
        let dir = TempDir::new().unwrap();
        let repo = DnaRepository::new(dir.path());
        assert!(repo.read("ghost", 0).is_err());
    }

    #[test]
    fn test_dedup_keeps_first_occurrence() {
        let dir = TempDir::new().unwrap();
        let repo = DnaRepository::new(dir.path());
        for fill in [0.6, 0.7, 0.6, 0.8, 0.7] {
            repo.write("ant", &dna(fill), WriteMode::Append).unwrap();
        }

        assert_eq!(repo.dedup("ant").unwrap(), 2);
        assert_eq!(
            repo.read_all("ant").unwrap(),
            vec![dna(0.6), dna(0.7), dna(0.8)]
        );
        assert_eq!(repo.dedup("ant").unwrap(), 0);
    }

    #[test]
    fn test_generation_save_load() {
        let dir = TempDir::new().unwrap();
        let repo = GenerationRepository::new(dir.path().join("runs"));

        let path = repo.save(&snapshot(7)).unwrap();
        assert!(path.ends_with("generation-000007.json"));

        let loaded = repo.load(7).unwrap();
        assert_eq!(loaded, snapshot_with_time(7, loaded.created_at));
    }

    fn snapshot_with_time(id: u64, created_at: chrono::DateTime<Utc>) -> EvolutionGeneration {
        EvolutionGeneration {
            created_at,
            ..snapshot(id)
        }
    }

    #[test]
    fn test_latest() {
        let dir = TempDir::new().unwrap();
        let repo = GenerationRepository::new(dir.path());
        assert!(repo.latest().unwrap().is_none());

        for id in [0, 2, 1] {
            repo.save(&snapshot(id)).unwrap();
        }
        fs::write(dir.path().join("notes.txt"), "ignored").unwrap();
        fs::write(dir.path().join("generation-x.json"), "{}").unwrap();

        assert_eq!(repo.generation_ids().unwrap(), vec![0, 1, 2]);
        assert_eq!(repo.latest().unwrap().unwrap().generation_id, 2);
    }
}
