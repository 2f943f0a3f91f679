//! Plain-text output for the offline commands
//!
//! ```text
//! Log:
//! * log:chilts:0190f3...=put:{"name":"Andrew"}
//! Data:
//! End
//! ```

use std::io::Write;

use super::errors::CliResult;
use crate::store::{DumpTarget, LogStore, Signature};

/// Writes every entry of `target`, one `* key=value` line each. Returns the
/// number of entries written.
pub fn write_dump<W: Write>(store: &dyn LogStore, target: DumpTarget, out: &mut W) -> CliResult<usize> {
    let mut written = 0;
    for namespace in target.namespaces() {
        writeln!(out, "{}:", namespace.label())?;
        for entry in namespace.scan(store)? {
            let entry = entry?;
            writeln!(
                out,
                "* {}={}",
                String::from_utf8_lossy(&entry.key),
                String::from_utf8_lossy(&entry.value)
            )?;
            written += 1;
        }
    }
    writeln!(out, "End")?;
    out.flush()?;
    Ok(written)
}

/// `<count> <digest>` on one line
pub fn write_signature<W: Write>(signature: &Signature, out: &mut W) -> CliResult<()> {
    writeln!(out, "{}", signature)?;
    out.flush()?;
    Ok(())
}
