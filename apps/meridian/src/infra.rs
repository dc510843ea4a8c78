use meridian_domain::repositories::artifacts::ArtifactWriter;
use meridian_domain::repositories::bar_table::BarTableRepository;
use meridian_infrastructure::artifacts::FilesystemArtifactWriter;
use meridian_infrastructure::market_data::bar_table::CsvBarTableRepository;

pub struct EngineDeps {
    pub bar_table: Box<dyn BarTableRepository>,
    pub artifacts: Box<dyn ArtifactWriter>,
}

pub struct ValidateDeps {
    pub bar_table: Box<dyn BarTableRepository>,
}

/// Sweep workers share the writer across threads, so it is held concretely.
pub struct SweepDeps {
    pub bar_table: Box<dyn BarTableRepository>,
    pub artifacts: FilesystemArtifactWriter,
}

pub fn build_engine_deps() -> EngineDeps {
    EngineDeps {
        bar_table: Box::new(CsvBarTableRepository::new()),
        artifacts: Box::new(FilesystemArtifactWriter::new()),
    }
}

pub fn build_validate_deps() -> ValidateDeps {
    ValidateDeps {
        bar_table: Box::new(CsvBarTableRepository::new()),
    }
}

pub fn build_sweep_deps() -> SweepDeps {
    SweepDeps {
        bar_table: Box::new(CsvBarTableRepository::new()),
        artifacts: FilesystemArtifactWriter::new(),
    }
}
