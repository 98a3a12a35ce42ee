#![allow(dead_code)]

use std::path::Path;

use assert_cmd::Command;
use insta_cmd::get_cargo_bin;

pub fn csync_cmd() -> Command {
	let mut cmd = Command::new(get_cargo_bin("csync"));
	cmd.env("NO_COLOR", "1").env_remove("CSYNC_API_TOKEN");
	cmd
}

/// Concept 7: depends on concepts 3 and G9 and stores into `Campo_Grata`.
pub const CONCEPT_SEVEN: &str = "using System;\n\n[Depends(typeof(C3))]\n[Depends(typeof(CG9))]\npublic \
                                 class C7\n{\n    #region Constructor\n    public C7() : base(Tipo.A, \
                                 \"7\", Periodo.M, \"Campo_Grata\", string.Empty) { }\n    \
                                 #endregion\n\n    #region Cálculo\n    return Valor(3) * \
                                 2;\n    #endregion\n}\n";

pub const TEMPLATE: &str = "<ac:structured-macro ac:name=\"code\"></ac:structured-macro>\n<table><tr><th><p><strong>Conceptos \
                            que usa</strong></p></th><td>XXXXX</td></tr>\n<tr><th><p><strong>Campos \
                            BBDD (G / A)</strong></p></th><td>XXXXX</td></tr></table>\n<ac:parameter \
                            ac:name=\"labels\">concepto_XXXXX</ac:parameter>\n";

/// A project with a `conceptos` source directory and a local template.
pub fn write_project(root: &Path, sources: &[(&str, &str)]) -> std::io::Result<()> {
	std::fs::write(
		root.join("csync.toml"),
		"[source]\ndir = \"conceptos\"\ninclude = [\"*.cs\"]\n",
	)?;
	std::fs::write(root.join("template.xml"), TEMPLATE)?;
	std::fs::create_dir_all(root.join("conceptos"))?;
	for (name, content) in sources {
		std::fs::write(root.join("conceptos").join(name), content)?;
	}

	Ok(())
}
