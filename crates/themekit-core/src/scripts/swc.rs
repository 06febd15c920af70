//! SWC pipeline for the script bundle.
//!
//! All sources are parsed into one shared source map so the emitted
//! mappings point back at the original files.

use super::{BundleOutput, EsTarget, ScriptError, ScriptSource};
use swc_common::{
    comments::{Comments, SingleThreadedComments},
    sync::Lrc,
    FileName, Globals, Mark, SourceMap, Spanned, DUMMY_SP, GLOBALS,
};
use swc_ecma_ast::{EsVersion, Program, Script};
use swc_ecma_codegen::{text_writer::JsWriter, Emitter};
use swc_ecma_minifier::option::{
    terser::TerserCompressorOptions, ExtraOptions, MangleOptions, MinifyOptions,
};
use swc_ecma_parser::{lexer::Lexer, EsSyntax, Parser, StringInput, Syntax};
use swc_ecma_transforms_base::{
    fixer::fixer,
    helpers::{inject_helpers, Helpers, HELPERS},
    hygiene::hygiene,
    resolver,
};
use swc_ecma_transforms_compat::{
    es2015, es2016, es2017, es2018, es2019, es2020, es2021, es2022,
};
use swc_ecma_visit::FoldWith;

impl EsTarget {
    fn es_version(self) -> EsVersion {
        match self {
            EsTarget::ES5 => EsVersion::Es5,
            EsTarget::ES2015 => EsVersion::Es2015,
            EsTarget::ES2016 => EsVersion::Es2016,
            EsTarget::ES2017 => EsVersion::Es2017,
            EsTarget::ES2018 => EsVersion::Es2018,
            EsTarget::ES2019 => EsVersion::Es2019,
            EsTarget::ES2020 => EsVersion::Es2020,
            EsTarget::ES2021 => EsVersion::Es2021,
            EsTarget::ES2022 => EsVersion::Es2022,
            EsTarget::ESNext => EsVersion::EsNext,
        }
    }
}

/// Rewrite syntax newer than `target`, newest features first.
fn lower(
    mut program: Program,
    target: EsTarget,
    unresolved_mark: Mark,
    comments: &SingleThreadedComments,
) -> Program {
    if target < EsTarget::ES2022 {
        program = program.fold_with(&mut es2022::es2022(
            Some(comments),
            es2022::Config::default(),
            unresolved_mark,
        ));
    }
    if target < EsTarget::ES2021 {
        program = program.fold_with(&mut es2021::es2021());
    }
    if target < EsTarget::ES2020 {
        program = program.fold_with(&mut es2020::es2020(
            es2020::Config::default(),
            unresolved_mark,
        ));
    }
    if target < EsTarget::ES2019 {
        program = program.fold_with(&mut es2019::es2019());
    }
    if target < EsTarget::ES2018 {
        program = program.fold_with(&mut es2018::es2018(es2018::Config::default()));
    }
    if target < EsTarget::ES2017 {
        program = program.fold_with(&mut es2017::es2017(
            es2017::Config::default(),
            Some(comments),
            unresolved_mark,
        ));
    }
    if target < EsTarget::ES2016 {
        program = program.fold_with(&mut es2016::es2016());
    }
    if target < EsTarget::ES2015 {
        program = program.fold_with(&mut es2015::es2015(
            unresolved_mark,
            Some(comments),
            es2015::Config::default(),
        ));
    }
    program
}

/// Parse, concatenate, lower, minify and emit `sources` as one classic script.
pub(super) fn bundle_sources(
    sources: &[ScriptSource],
    target: EsTarget,
    minify: bool,
) -> Result<BundleOutput, ScriptError> {
    let cm: Lrc<SourceMap> = Default::default();
    let comments = SingleThreadedComments::default();

    let mut body = Vec::new();
    for source in sources {
        let fm = cm.new_source_file(
            Lrc::new(FileName::Custom(source.name.clone())),
            source.code.clone(),
        );

        let lexer = Lexer::new(
            Syntax::Es(EsSyntax::default()),
            EsVersion::EsNext,
            StringInput::from(&*fm),
            Some(&comments),
        );
        let mut parser = Parser::new_from(lexer);

        let script = parser.parse_script().map_err(|e| ScriptError::Parse {
            file: source.name.clone(),
            line: cm.lookup_char_pos(e.span().lo).line,
            message: format!("{:?}", e.kind()),
        })?;

        // Recoverable errors still mean the input is not valid script
        if let Some(e) = parser.take_errors().into_iter().next() {
            return Err(ScriptError::Parse {
                file: source.name.clone(),
                line: cm.lookup_char_pos(e.span().lo).line,
                message: format!("{:?}", e.kind()),
            });
        }

        body.extend(script.body);
    }

    let program = GLOBALS.set(&Globals::default(), || -> Result<Program, ScriptError> {
        let unresolved_mark = Mark::new();
        let top_level_mark = Mark::new();

        let mut program = Program::Script(Script {
            span: DUMMY_SP,
            body,
            shebang: None,
        });

        program = program.fold_with(&mut resolver(unresolved_mark, top_level_mark, false));

        // Helpers (class checks, spread, regenerator) are inlined into the bundle
        program = HELPERS.set(&Helpers::new(false), || {
            let lowered = lower(program, target, unresolved_mark, &comments);
            lowered.fold_with(&mut inject_helpers(unresolved_mark))
        });

        if minify {
            let compress = serde_json::from_value::<TerserCompressorOptions>(
                serde_json::json!({}),
            )
            .map_err(|e| ScriptError::Minify(e.to_string()))?
            .into_config(cm.clone());

            program = swc_ecma_minifier::optimize(
                program,
                cm.clone(),
                Some(&comments as &dyn Comments),
                None,
                &MinifyOptions {
                    compress: Some(compress),
                    mangle: Some(MangleOptions::default()),
                    ..Default::default()
                },
                &ExtraOptions {
                    unresolved_mark,
                    top_level_mark,
                    mangle_name_cache: None,
                },
            );
        }

        program = program.fold_with(&mut hygiene());
        program = program.fold_with(&mut fixer(Some(&comments)));
        Ok(program)
    })?;

    let mut buf = Vec::new();
    let mut src_map_buf = Vec::new();

    {
        let writer = JsWriter::new(cm.clone(), "\n", &mut buf, Some(&mut src_map_buf));

        let mut emitter = Emitter {
            cfg: swc_ecma_codegen::Config::default()
                .with_minify(minify)
                .with_target(target.es_version()),
            cm: cm.clone(),
            comments: if minify {
                None
            } else {
                Some(&comments as &dyn Comments)
            },
            wr: writer,
        };

        let emitted = match &program {
            Program::Script(script) => emitter.emit_script(script),
            Program::Module(module) => emitter.emit_module(module),
        };
        emitted.map_err(|e| ScriptError::Emit(e.to_string()))?;
    }

    let code = String::from_utf8(buf).map_err(|e| ScriptError::Emit(e.to_string()))?;

    let srcmap = cm.build_source_map(&src_map_buf);
    let mut map_buf = Vec::new();
    srcmap
        .to_writer(&mut map_buf)
        .map_err(|e| ScriptError::SourceMap(e.to_string()))?;
    let map = String::from_utf8(map_buf).map_err(|e| ScriptError::SourceMap(e.to_string()))?;

    Ok(BundleOutput { code, map })
}
