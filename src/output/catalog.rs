use crate::catalog::CatalogSummary;
use crate::model::CategoryWithScripts;
use crate::output::{accent, bold, info, muted};
use std::io::Write;

pub fn print_catalog(
    mut w: impl Write,
    catalog: &[CategoryWithScripts],
    summary: CatalogSummary,
) -> std::io::Result<()> {
    if catalog.is_empty() {
        writeln!(w, "{} {}", info("i"), muted("No automation scripts available."))?;
        return Ok(());
    }

    for entry in catalog {
        writeln!(w, "{}", bold(&entry.category.name))?;

        if entry.scripts.is_empty() {
            writeln!(w, "  {}", muted("(no scripts)"))?;
        }

        for script in &entry.scripts {
            writeln!(w, "  {} {}", accent(&script.name), muted(&script.filename))?;
            writeln!(w, "    id: {}", script.id)?;

            if let Some(description) = script.description.as_deref()
                && !description.trim().is_empty()
            {
                writeln!(w, "    {description}")?;
            }
        }

        writeln!(w)?;
    }

    writeln!(
        w,
        "{}",
        muted(&format!(
            "{} automation scripts across {} categories",
            summary.scripts, summary.categories
        ))
    )
}
