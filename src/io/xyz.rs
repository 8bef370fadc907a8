use std::io::Write;

use super::{ExportError, FileExporter};
use crate::core::{DataCollection, StandardType};

/// Exporter for the classic XYZ text format: particle count, a comment
/// line, then one `species x y z` line per particle. Species names are
/// resolved through the particle type property when one is present.
pub struct XyzExporter;

impl FileExporter for XyzExporter {
    fn export(&self, data: &DataCollection, out: &mut dyn Write) -> Result<(), ExportError> {
        let positions = data
            .get_property(StandardType::Position)
            .ok_or(ExportError::MissingData("position"))?;
        let coords = positions.floats().map_err(ExportError::Data)?;

        writeln!(out, "{}", positions.row_count())?;
        writeln!(out, "frame exported by partdata")?;

        let types = data.get_property(StandardType::ParticleType);
        for i in 0..positions.row_count() {
            let species = types
                .and_then(|t| {
                    let id = t.ints().ok()?[(i, 0)];
                    Some(t.find_type(id)?.name.clone())
                })
                .unwrap_or_else(|| "X".to_owned());
            writeln!(
                out,
                "{} {} {} {}",
                species,
                coords[(i, 0)],
                coords[(i, 1)],
                coords[(i, 2)]
            )?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{ParticleType, PropertyStore};

    #[test]
    fn writes_species_and_coordinates() -> anyhow::Result<()> {
        let mut data = DataCollection::new();

        let mut pos = PropertyStore::new_standard(StandardType::Position, 2)?;
        {
            let mut g = pos.begin_write();
            let mut view = g.floats_mut()?;
            view[(1, 0)] = 1.5;
        }
        data.add(pos);

        let mut types = PropertyStore::new_standard(StandardType::ParticleType, 2)?;
        types.push_type(ParticleType::new(1, "H"));
        types.push_type(ParticleType::new(2, "O"));
        {
            let mut g = types.begin_write();
            let mut view = g.ints_mut()?;
            view[(0, 0)] = 1;
            view[(1, 0)] = 2;
        }
        data.add(types);

        let mut buf = Vec::new();
        XyzExporter.export(&data, &mut buf)?;
        let text = String::from_utf8(buf)?;
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines[0], "2");
        assert_eq!(lines[2], "H 0 0 0");
        assert_eq!(lines[3], "O 1.5 0 0");
        Ok(())
    }

    #[test]
    fn missing_positions() {
        let data = DataCollection::new();
        let mut buf = Vec::new();
        assert!(matches!(
            XyzExporter.export(&data, &mut buf),
            Err(ExportError::MissingData(_))
        ));
    }
}
