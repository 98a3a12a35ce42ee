use crate::ConceptRecord;

/// A concept source file with a constructor, two dependency lines and a
/// calculation region holding one nested region.
pub const CONCEPT_SOURCE: &str = r#"using System;
using Calc.Core;

namespace Calc.Conceptos
{
    [Depends(typeof(C3))]
    [Depends(typeof(CG9))]
    public class C7 : ConceptBase
    {
        #region Constructor
        /// <summary>Concept 7.</summary>
        public C7() : base(Tipo.Calculo, "7", Periodo.Mensual, "Campo_Grata", string.Empty) { }
        #endregion

        #region Cálculo
        public override decimal Calcular(Contexto ctx)
        {
            #region Ajustes
            var x = ctx.Valor(3);
            #endregion
            return x * 2;
        }
        #endregion
    }
}
"#;

/// The calculation region of [`CONCEPT_SOURCE`], markers excluded.
pub const CONCEPT_CALCULATION: &str = r#"        public override decimal Calcular(Contexto ctx)
        {
            #region Ajustes
            var x = ctx.Valor(3);
            #endregion
            return x * 2;
        }
"#;

pub const MACRO_SECTION: &str = "<ac:structured-macro ac:name=\"code\"><ac:parameter \
                                 ac:name=\"language\">csharp</ac:parameter></ac:structured-macro>";
pub const DEPENDENCIES_SECTION: &str =
	"<table><tr><th><p><strong>Conceptos que usa</strong></p></th><td>XXXXX</td></tr>";
pub const FIELDS_SECTION: &str =
	"<tr><th><p><strong>Campos BBDD (G / A)</strong></p></th><td>XXXXX</td></tr></table>";
pub const LABELS_SECTION: &str = "<ac:structured-macro ac:name=\"contentbylabel\"><ac:parameter \
                                  ac:name=\"labels\">concepto_XXXXX</ac:parameter></ac:structured-macro>";

/// A page template carrying every anchor, each followed by a five character
/// placeholder.
pub fn full_template() -> String {
	[
		MACRO_SECTION,
		DEPENDENCIES_SECTION,
		FIELDS_SECTION,
		LABELS_SECTION,
	]
	.join("\n")
}

/// Template built from the given sections only.
pub fn template_with(sections: &[&str]) -> String {
	sections.join("\n")
}

pub fn record(id: &str, tokens: &[&str], lines: &[&str]) -> ConceptRecord {
	ConceptRecord {
		id: id.to_string(),
		calculation_lines: lines.iter().map(ToString::to_string).collect(),
		dependency_tokens: tokens.iter().map(ToString::to_string).collect(),
		primary_field: None,
		secondary_field: None,
	}
}
