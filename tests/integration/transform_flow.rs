//! Scenario tests for directive resolution and rewriting over realistic
//! source shapes: nested types, interfaces, enums, records, wildcards.

use at_patcher::java::SourceFile;
use at_patcher::pipeline::{transform, TransformOptions};
use at_patcher::resolve::{DiagnosticKind, Severity};
use at_patcher::rewrite::{MergeSemantics, RewriteOptions, WidenPolicy};

fn apply(at: &str, java: &str) -> String {
    apply_with(at, java, TransformOptions::default())
}

fn apply_with(at: &str, java: &str, options: TransformOptions) -> String {
    let outcome = transform(at, vec![SourceFile::new("T.java", java)], options).unwrap();
    assert!(
        !outcome.has_errors(),
        "unexpected diagnostics: {:?}",
        outcome.diagnostics
    );
    match outcome.outputs.into_iter().next() {
        Some(output) => output.text,
        None => java.to_string(),
    }
}

#[test]
fn interface_members_and_nested_enum() {
    let java = "\
package net.example;

public interface Store {
    int LIMIT = 100;

    enum Mode {
        READ, WRITE;

        private int uses;

        private void bump() {
            uses++;
        }
    }
}
";
    let output = apply(
        "public net.example.Store$Mode uses\npublic net.example.Store$Mode bump()V\n",
        java,
    );
    assert!(output.contains("public int uses;"));
    assert!(output.contains("public void bump()"));
    assert!(output.contains("int LIMIT = 100;"));
}

#[test]
fn record_members_resolve() {
    let java = "\
package a;

record Point(int x, int y) {
    private static int counter;

    private Point scaled(int factor) {
        return new Point(x * factor, y * factor);
    }
}
";
    let output = apply(
        "public a.Point\npublic a.Point counter\npublic a.Point scaled(I)La/Point;\n",
        java,
    );
    assert!(output.contains("public record Point"));
    assert!(output.contains("public static int counter;"));
    assert!(output.contains("public Point scaled(int factor)"));
}

#[test]
fn wildcard_fields_and_methods_cover_whole_type() {
    let java = "\
package a;

class Bag {
    private int a;
    private int b, c;

    private Bag() {}

    private void put() {}
    private void take() {}
}
";
    let output = apply("public a.Bag *\npublic a.Bag *()\n", java);
    assert!(output.contains("public int a;"));
    assert!(output.contains("public int b, c;"));
    assert!(output.contains("public void put()"));
    assert!(output.contains("public void take()"));
    // Wildcard methods never touch constructors.
    assert!(output.contains("private Bag()"));
}

#[test]
fn annotations_survive_modifier_rewrites() {
    let java = "\
package a;

class Holder {
    @Deprecated
    private int legacy;

    @SuppressWarnings(\"unchecked\")
    private void cast() {}
}
";
    let output = apply("public a.Holder legacy\npublic a.Holder cast()V\n", java);
    assert!(output.contains("@Deprecated\n    public int legacy;"));
    assert!(output.contains("@SuppressWarnings(\"unchecked\")\n    public void cast()"));
}

#[test]
fn static_initializer_target_resolves_nothing_but_clinit_parses() {
    let java = "package a;\nclass A {\n    static { }\n}\n";
    let outcome = transform(
        "public a.A <clinit>()V\n",
        vec![SourceFile::new("A.java", java)],
        TransformOptions::default(),
    )
    .unwrap();
    // Static initializers have no modifier slot; the directive must fail
    // loudly instead of silently matching something else.
    assert!(outcome.has_errors());
    assert_eq!(
        outcome.diagnostics[0].kind,
        DiagnosticKind::UnresolvedTarget
    );
}

#[test]
fn later_directive_wins_but_finality_sticks() {
    let java = "package a;\nclass A {\n    private final int x = 1;\n}\n";
    let output = apply("public-f a.A x\ndefault a.A x\n", java);
    assert_eq!(output, "package a;\nclass A {\n    int x = 1;\n}\n");
}

#[test]
fn replace_merge_forgets_earlier_finality() {
    let java = "package a;\nclass A {\n    private final int x = 1;\n}\n";
    let options = TransformOptions {
        rewrite: RewriteOptions {
            merge: MergeSemantics::Replace,
            ..Default::default()
        },
        ..Default::default()
    };
    let output = apply_with("public-f a.A x\ndefault a.A x\n", java, options);
    assert_eq!(output, "package a;\nclass A {\n    final int x = 1;\n}\n");
}

#[test]
fn widen_warn_reports_narrowing_but_applies() {
    let java = "package a;\nclass A {\n    public int x;\n}\n";
    let options = TransformOptions {
        rewrite: RewriteOptions {
            widen: WidenPolicy::Warn,
            ..Default::default()
        },
        ..Default::default()
    };
    let outcome = transform(
        "protected a.A x\n",
        vec![SourceFile::new("A.java", java)],
        options,
    )
    .unwrap();
    assert!(!outcome.has_errors());
    assert_eq!(outcome.diagnostics.len(), 1);
    assert_eq!(outcome.diagnostics[0].severity, Severity::Warning);
    assert_eq!(outcome.diagnostics[0].kind, DiagnosticKind::IllegalWidening);
    assert!(outcome.outputs[0].text.contains("protected int x;"));
}

#[test]
fn overload_ambiguity_names_candidates() {
    let java = "\
package a;
class A {
    private void go(int v) {}
    private void go(long v) {}
}
";
    let outcome = transform(
        "public a.A go\n",
        vec![SourceFile::new("A.java", java)],
        TransformOptions::default(),
    )
    .unwrap();
    assert!(outcome.has_errors());
    let d = &outcome.diagnostics[0];
    assert_eq!(d.kind, DiagnosticKind::AmbiguousTarget);
    assert!(d.message.contains("go(int)"), "{}", d.message);
    assert!(d.message.contains("go(long)"), "{}", d.message);
}

#[test]
fn generic_method_matches_erased_descriptor() {
    let java = "\
package a;
class Box<T> {
    private T value;

    private <R> R map(java.util.function.Function<T, R> fn) {
        return fn.apply(value);
    }
}
";
    let output = apply(
        "public a.Box value\npublic a.Box map(Ljava/util/function/Function;)Ljava/lang/Object;\n",
        java,
    );
    assert!(output.contains("public T value;"));
    assert!(output.contains("public <R> R map"));
}

#[test]
fn method_directive_widens_subclass_overrides() {
    let base = "\
package io.test;

public class Task {
    protected String run(final Object parameter) {
        return \"hi there\";
    }
}
";
    let sub = "\
package io.test;

public class LongTask extends Task {
    @Override
    protected String run(final Object parameter) {
        return \"hi there but better\";
    }
}
";
    let outcome = transform(
        "public io.test.Task run(Ljava/lang/Object;)Ljava/lang/String;\n",
        vec![
            SourceFile::new("Task.java", base),
            SourceFile::new("LongTask.java", sub),
        ],
        TransformOptions::default(),
    )
    .unwrap();

    assert!(!outcome.has_errors(), "{:?}", outcome.diagnostics);
    assert_eq!(outcome.outputs.len(), 2);
    let sub_out = outcome
        .outputs
        .iter()
        .find(|o| o.path.ends_with("LongTask.java"))
        .unwrap();
    assert_eq!(
        sub_out.text,
        "\
package io.test;

public class LongTask extends Task {
    @Override
    public String run(final Object parameter) {
        return \"hi there but better\";
    }
}
"
    );
}

#[test]
fn directives_across_multiple_files() {
    let a = "package p;\nclass A {\n    private int x;\n}\n";
    let b = "package p;\nclass B {\n    private int y;\n}\n";
    let outcome = transform(
        "public p.A x\npublic p.B y\n",
        vec![
            SourceFile::new("A.java", a),
            SourceFile::new("B.java", b),
        ],
        TransformOptions::default(),
    )
    .unwrap();
    assert_eq!(outcome.outputs.len(), 2);
    assert!(outcome
        .outputs
        .iter()
        .any(|o| o.text.contains("public int x;")));
    assert!(outcome
        .outputs
        .iter()
        .any(|o| o.text.contains("public int y;")));
}
