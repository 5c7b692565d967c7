// Tests for module emission

#[cfg(test)]
mod tests {
    use crate::{generate_module, CompileOptions, LoopLowering};
    use pretty_assertions::assert_eq;
    use tlc_frontend::Frontend;

    fn compile(source: &str) -> String {
        let program = Frontend::parse_source(source).unwrap();
        generate_module(&program, &CompileOptions::default()).unwrap()
    }

    fn compile_truncating(source: &str) -> String {
        let program = Frontend::parse_source(source).unwrap();
        let options = CompileOptions {
            loop_lowering: LoopLowering::TruncatingNonzero,
        };
        generate_module(&program, &options).unwrap()
    }

    const FIB: &str = "\
def fib(x)
  if x < 3 then
    1
  else
    fib(x - 1) + fib(x - 2)

# Compute the 40th number
fib(40)
";

    #[test]
    fn test_fib_module() {
        assert_eq!(
            compile(FIB),
            "\
function Teleidoscope(stdlib, foreign, heap) {
  \"use asm\";

  function fib(x) {
    x = +x;
    if (x < 3.) return 1.; else return +fib(x - 1.) + +fib(x - 2.);
  }

  function $main() {
    return +fib(40.);
  }

  return { main: $main };
}
"
        );
    }

    const STARS: &str = "\
extern putchar(c)
def printstar(n)
  for i = 1, i < n, 1.0 in
    putchar(42)

printstar(72);
putchar(10);
";

    #[test]
    fn test_stars_module() {
        assert_eq!(
            compile(STARS),
            "\
function Teleidoscope(stdlib, foreign, heap) {
  \"use asm\";

  var putchar = foreign.putchar;

  function printstar(n) {
    n = +n;
    var i = 0.;
    i = 1.;
    for (;;) {
      putchar(42.);
      if (!(i < n)) break;
      i = i + 1.;
    }
  }

  function $main() {
    printstar(72.);
    putchar(10.);
  }

  return { main: $main };
}
"
        );
    }

    #[test]
    fn test_stars_module_truncating() {
        let module = compile_truncating(STARS);
        assert!(module.contains("      if (!~~(n - i)) break;\n"));
        assert!(!module.contains("i < n"));
    }

    #[test]
    fn test_trig_module_imports_only_whats_used() {
        let source = "\
extern sin(arg);
extern cos(arg);
extern atan2(arg1 arg2);

atan2(sin(.4), cos(42))
";
        assert_eq!(
            compile(source),
            "\
function Teleidoscope(stdlib, foreign, heap) {
  \"use asm\";

  var sin = stdlib.Math.sin;
  var cos = stdlib.Math.cos;
  var atan2 = stdlib.Math.atan2;

  function $main() {
    return atan2(sin(0.4), cos(42.));
  }

  return { main: $main };
}
"
        );
    }

    #[test]
    fn test_determinism() {
        assert_eq!(compile(FIB), compile(FIB));
        assert_eq!(compile(STARS), compile(STARS));
    }

    #[test]
    fn test_compilations_are_independent() {
        let first = compile(FIB);
        let _ = compile(STARS);
        assert_eq!(compile(FIB), first);
    }

    #[test]
    fn test_parameter_reannotation_prefix() {
        let module = compile("def hypot2(a b) a * a + b * b\nhypot2(3, 4)");
        let lines: Vec<&str> = module.lines().collect();
        let start = lines
            .iter()
            .position(|line| line.starts_with("  function hypot2"))
            .unwrap();
        // The first N statements re-annotate the N parameters in
        // declaration order
        assert_eq!(lines[start + 1], "    a = +a;");
        assert_eq!(lines[start + 2], "    b = +b;");
    }

    #[test]
    fn test_export_shape() {
        for source in ["1", "def f(x) x\nf(1)", "def main(x) x\nmain(2)"] {
            let module = compile(source);
            assert_eq!(
                module
                    .lines()
                    .filter(|line| line.contains("return {"))
                    .collect::<Vec<_>>(),
                vec!["  return { main: $main };"]
            );
        }
    }

    #[test]
    fn test_user_main_keeps_export_on_entry() {
        let module = compile("def main(x) x + 1\nmain(1)");
        assert!(module.contains("  function main(x) {"));
        assert!(module.contains("  function $main() {"));
        assert!(module.contains("    return +main(1.);"));
        assert!(module.contains("  return { main: $main };"));
    }

    #[test]
    fn test_value_position_if_is_hoisted() {
        let module = compile("def f(x) 1 + (if x < 2 then 3 else 4)\nf(1)");
        assert!(module.contains(
            "\
  function f(x) {
    x = +x;
    var $t0 = 0.;
    if (x < 2.) $t0 = 3.; else $t0 = 4.;
    return 1. + $t0;
  }
"
        ));
    }

    #[test]
    fn test_loop_variable_shadowing_a_parameter() {
        let module = compile("extern putchar(c)\ndef f(i) for i = 1, i < 10 in putchar(i)\nf(1)");
        assert!(module.contains("    var i$1 = 0.;"));
        assert!(module.contains("      putchar(i$1);"));
        assert!(module.contains("      if (!(i$1 < 10.)) break;"));
    }

    #[test]
    fn test_comparison_returned_as_double() {
        let module = compile("def isless(a b) a < b\nisless(1, 2)");
        assert!(module.contains("    return +(a < b);"));
    }

    #[test]
    fn test_double_condition_tested_nonzero() {
        let module = compile("def f(x) if x then 1 else 2\nf(1)");
        assert!(module.contains("    if (x != 0.) return 1.; else return 2.;"));
    }

    #[test]
    fn test_stdlib_constant_import() {
        let module = compile("PI * 2");
        assert!(module.contains("  var PI = stdlib.Math.PI;"));
        assert!(module.contains("    return PI * 2.;"));
    }

    #[test]
    fn test_trailing_user_void_call_returns_nothing() {
        let module = compile(
            "extern putchar(c)\n\
             def printstar(n) for i = 1, i < n in putchar(42)\n\
             printstar(72)",
        );
        assert!(module.contains("    printstar(72.);\n  }"));
        assert!(!module.contains("return printstar"));
        assert!(!module.contains("return +printstar"));
    }

    #[test]
    fn test_empty_entry_for_definition_only_program() {
        let module = compile("def f(x) x + 1");
        assert!(module.contains("  function $main() {\n  }\n"));
    }

    #[test]
    fn test_foreign_call_result_coerced_when_consumed() {
        let module = compile("extern getnum()\ngetnum() + 1");
        assert!(module.contains("    return +getnum() + 1.;"));
    }

    #[test]
    fn test_call_order_preserved_around_hoisted_if() {
        let module = compile("extern geta()\nextern getb()\ngeta() + (if getb() then 1 else 2)");
        let first = module.find("$t0 = +geta();").unwrap();
        let second = module.find("if (+getb() != 0.)").unwrap();
        assert!(first < second);
        assert!(module.contains("    return $t0 + $t1;"));
    }

    #[test]
    fn test_hoisted_if_inside_loop_condition() {
        let module = compile(
            "extern putchar(c)\n\
             for i = 1, if i < 3 then 1 else 0, 1 in putchar(42)",
        );
        // The branch selection re-runs on every iteration, inside the
        // loop body, ahead of the break test
        let loop_start = module.find("for (;;) {").unwrap();
        let branch = module.find("if (i < 3.) $t0 = 1.; else $t0 = 0.;").unwrap();
        let break_test = module.find("if ($t0 == 0.) break;").unwrap();
        assert!(loop_start < branch);
        assert!(branch < break_test);
    }
}
