//! Result assembly.
//!
//! Turns the files a separation run left in a job's output directory into
//! [`Track`]s with display labels and public URLs.

use std::fs;
use std::io::ErrorKind;
use std::path::PathBuf;

use tracing::{debug, warn};
use url::Url;

use crate::cache::ArtifactStore;
use crate::error::{PipelineError, Result};
use crate::types::{DisplayNames, JobId, Track, CANONICAL_EXTENSION};

/// URL path under which job output directories are served.
pub const FILES_ROUTE: &str = "/static/files";

/// Tracks found for one job.
#[derive(Debug, Clone)]
pub struct AssembledTracks {
    /// Job the tracks belong to.
    pub job_id: JobId,
    /// Directory the tracks were listed from.
    pub output_dir: PathBuf,
    /// One entry per `.wav` file, sorted by file name.
    pub tracks: Vec<Track>,
}

impl AssembledTracks {
    /// Returns display labels, index-aligned with [`Self::urls`].
    pub fn display_names(&self) -> Vec<String> {
        self.tracks.iter().map(|t| t.display_name.clone()).collect()
    }

    /// Returns track URLs, index-aligned with [`Self::display_names`].
    pub fn urls(&self) -> Vec<String> {
        self.tracks.iter().map(|t| t.file_url.clone()).collect()
    }

    /// Returns the number of tracks.
    pub fn len(&self) -> usize {
        self.tracks.len()
    }

    /// Returns true if no tracks were found.
    pub fn is_empty(&self) -> bool {
        self.tracks.is_empty()
    }
}

/// Lists output directories and builds addressable tracks.
#[derive(Debug, Clone)]
pub struct ResultAssembler {
    store: ArtifactStore,
    public_url: Url,
    names: DisplayNames,
}

impl ResultAssembler {
    /// Creates an assembler publishing under `public_url`.
    ///
    /// The URL must be able to carry path segments (`http://host[/prefix]`).
    pub fn new(store: ArtifactStore, public_url: Url, names: DisplayNames) -> Result<Self> {
        if public_url.cannot_be_a_base() {
            return Err(PipelineError::unexpected(format!(
                "public URL {} cannot carry file paths",
                public_url
            )));
        }
        Ok(Self {
            store,
            public_url,
            names,
        })
    }

    /// Returns the display-name table.
    pub fn names(&self) -> &DisplayNames {
        &self.names
    }

    /// Returns the public URL of `file_name` in the output of `job_id`.
    ///
    /// The job identifier and file name are percent-encoded as single path
    /// segments, so `?`, `#` or spaces in them stay part of the path.
    pub fn track_url(&self, job_id: &JobId, file_name: &str) -> String {
        let mut url = self.public_url.clone();
        if let Ok(mut segments) = url.path_segments_mut() {
            segments
                .pop_if_empty()
                .extend(FILES_ROUTE.split('/').filter(|s| !s.is_empty()))
                .extend([job_id.as_str(), file_name]);
        }
        url.to_string()
    }

    /// Collects every `.wav` file in the job's output directory.
    pub fn assemble(&self, job_id: &JobId) -> Result<AssembledTracks> {
        let output_dir = self.store.output_dir_path(job_id);
        let entries = match fs::read_dir(&output_dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                return Ok(AssembledTracks {
                    job_id: job_id.clone(),
                    output_dir,
                    tracks: Vec::new(),
                })
            }
            Err(e) => {
                return Err(PipelineError::io(
                    format!("listing {}", output_dir.display()),
                    e,
                ))
            }
        };

        let mut file_names = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|e| {
                PipelineError::io(format!("listing {}", output_dir.display()), e)
            })?;
            if !entry.path().is_file() {
                continue;
            }
            match entry.file_name().into_string() {
                Ok(name) if name.ends_with(CANONICAL_EXTENSION) => file_names.push(name),
                Ok(_) => {}
                Err(name) => warn!(job_id = %job_id, ?name, "skipping non UTF-8 file name"),
            }
        }
        file_names.sort();

        let tracks: Vec<Track> = file_names
            .into_iter()
            .map(|file_name| {
                let key = &file_name[..file_name.len() - CANONICAL_EXTENSION.len()];
                let url = self.track_url(job_id, &file_name);
                Track::new(key, file_name.clone(), url, &self.names)
            })
            .collect();

        debug!(job_id = %job_id, tracks = tracks.len(), "assembled tracks");
        Ok(AssembledTracks {
            job_id: job_id.clone(),
            output_dir,
            tracks,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn setup(root: &std::path::Path) -> (ResultAssembler, JobId, PathBuf) {
        let store = ArtifactStore::new(root.join("tmp"), root.join("files"));
        let job_id = JobId::parse("song").unwrap();
        let out = store.output_dir(&job_id).unwrap();
        let assembler = ResultAssembler::new(store, base("http://127.0.0.1:9999/"), DisplayNames::standard())
            .unwrap();
        (assembler, job_id, out)
    }

    fn base(url: &str) -> Url {
        Url::parse(url).unwrap()
    }

    #[test]
    fn names_and_urls_stay_aligned() {
        let dir = tempdir().unwrap();
        let (assembler, job_id, out) = setup(dir.path());
        fs::write(out.join("vocals.wav"), b"v").unwrap();
        fs::write(out.join("accompaniment.wav"), b"a").unwrap();

        let result = assembler.assemble(&job_id).unwrap();
        let names = result.display_names();
        let urls = result.urls();
        assert_eq!(names.len(), urls.len());
        assert_eq!(names, ["accompaniment", "vocals"]);
        for (track, url) in result.tracks.iter().zip(&urls) {
            assert!(url.ends_with(&format!("/{}", track.file_name)));
        }
        assert_eq!(
            urls[1],
            "http://127.0.0.1:9999/static/files/song/vocals.wav"
        );
    }

    #[test]
    fn unknown_instrument_passes_through() {
        let dir = tempdir().unwrap();
        let (assembler, job_id, out) = setup(dir.path());
        fs::write(out.join("guitar.wav"), b"g").unwrap();

        let result = assembler.assemble(&job_id).unwrap();
        assert_eq!(result.display_names(), ["guitar"]);
        assert_eq!(result.tracks[0].instrument_key, "guitar");
    }

    #[test]
    fn only_wav_files_are_tracks() {
        let dir = tempdir().unwrap();
        let (assembler, job_id, out) = setup(dir.path());
        fs::write(out.join("drums.wav"), b"d").unwrap();
        fs::write(out.join("log.txt"), b"l").unwrap();
        fs::write(out.join("bass.WAV"), b"b").unwrap();
        fs::create_dir_all(out.join("nested.wav")).unwrap();

        let result = assembler.assemble(&job_id).unwrap();
        assert_eq!(result.display_names(), ["drums"]);
    }

    #[test]
    fn missing_output_dir_yields_no_tracks() {
        let dir = tempdir().unwrap();
        let store = ArtifactStore::new(dir.path().join("tmp"), dir.path().join("files"));
        let assembler = ResultAssembler::new(store, base("http://h"), DisplayNames::standard()).unwrap();
        let result = assembler.assemble(&JobId::parse("never").unwrap()).unwrap();
        assert!(result.is_empty());
    }

    #[test]
    fn reserved_characters_stay_in_the_path() {
        let dir = tempdir().unwrap();
        let store = ArtifactStore::new(dir.path().join("tmp"), dir.path().join("files"));
        let job_id = JobId::parse("what?#1 (live)").unwrap();
        fs::write(store.output_dir(&job_id).unwrap().join("vocals.wav"), b"v").unwrap();
        let assembler = ResultAssembler::new(store, base("http://h"), DisplayNames::standard()).unwrap();

        let urls = assembler.assemble(&job_id).unwrap().urls();
        assert_eq!(urls, ["http://h/static/files/what%3F%231%20(live)/vocals.wav"]);

        let parsed = Url::parse(&urls[0]).unwrap();
        assert_eq!(parsed.query(), None);
        assert_eq!(parsed.fragment(), None);
        let segments: Vec<&str> = parsed.path_segments().unwrap().collect();
        assert_eq!(segments, ["static", "files", "what%3F%231%20(live)", "vocals.wav"]);
    }

    #[test]
    fn public_url_prefix_is_kept() {
        let dir = tempdir().unwrap();
        let store = ArtifactStore::new(dir.path().join("tmp"), dir.path().join("files"));
        let assembler =
            ResultAssembler::new(store, base("https://example.com/stems/"), DisplayNames::standard())
                .unwrap();
        let url = assembler.track_url(&JobId::parse("song").unwrap(), "vocals.wav");
        assert_eq!(url, "https://example.com/stems/static/files/song/vocals.wav");
    }

    #[test]
    fn opaque_public_url_is_rejected() {
        let dir = tempdir().unwrap();
        let store = ArtifactStore::new(dir.path().join("tmp"), dir.path().join("files"));
        assert!(ResultAssembler::new(store, base("mailto:stems@example.com"), DisplayNames::standard()).is_err());
    }
}
