pub mod acopio;
pub mod carga_masiva;
pub mod cobro_certificado;
pub mod derived;
pub mod desacopio;
pub mod dialog;

pub use acopio::AcopioDialog;
pub use carga_masiva::{CargaMasiva, RelationField};
pub use cobro_certificado::CobroDialog;
pub use desacopio::{load_resumen, AcopioResumen, DesacopioDialog};
pub use dialog::{confirm_delete, DialogMode, RecordDialog, RecordForm};
