use lineprof::instrument::instrument;
use lineprof_common::{Hook, HookLog, LineHooks, NoHooks};
use lineprof_script::{parse, Interpreter, Program, RuntimeError};
use std::cell::RefCell;
use std::io::{self, Write};
use std::rc::Rc;

#[derive(Clone, Default)]
struct Captured(Rc<RefCell<Vec<u8>>>);

impl Write for Captured {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.borrow_mut().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

fn execute<H: LineHooks>(hooks: H, program: &Program) -> (String, Result<(), RuntimeError>, H) {
    let out = Captured::default();
    let mut interpreter = Interpreter::new(hooks, Box::new(out.clone()));
    let result = interpreter.run(program);
    let text = String::from_utf8(out.0.borrow().clone()).unwrap();
    (text, result, interpreter.into_hooks())
}

/// Plain run and instrumented run print the same and fail the same way
fn assert_preserved(source: &str) {
    let plain = parse(source).unwrap();
    let woven = instrument(plain.clone()).program;

    let (plain_out, plain_result, _) = execute(NoHooks, &plain);
    let (woven_out, woven_result, _) = execute(NoHooks, &woven);

    assert_eq!(plain_out, woven_out, "output differs for:\n{source}");
    assert_eq!(plain_result, woven_result, "outcome differs for:\n{source}");
}

#[test]
fn test_semantics_preserved_control_flow() {
    assert_preserved(
        "\
total = 0
for i in range(10):
    if i % 3 == 0:
        continue
    if i > 7:
        break
    total += i
else:
    print('unreachable')
print(total)
n = 5
while n:
    n -= 1
else:
    print('drained', n)
",
    );
}

#[test]
fn test_semantics_preserved_functions_and_scopes() {
    assert_preserved(
        "\
counter = 0
def bump(k):
    global counter
    counter += k
    return counter
def make_adder(a):
    def add(b):
        return a + b
    return add
print(bump(2), bump(3))
print(make_adder(10)(5))
class Box:
    def __init__(self, v):
        self.v = v
    def get(self):
        return self.v
print(Box(7).get())
",
    );
}

#[test]
fn test_semantics_preserved_exceptions() {
    assert_preserved(
        "\
def risky(x):
    return 10 / x
try:
    risky(0)
except ZeroDivisionError as e:
    print('caught', e)
else:
    print('no error')
finally:
    print('cleanup')
try:
    d = {'a': 1}
    d['b']
except LookupError:
    print('lookup')
",
    );
}

#[test]
fn test_semantics_preserved_uncaught_fault() {
    assert_preserved("x = 1\nprint(x)\ny = undefined_name\nprint('never')\n");
    assert_preserved("items = []\nitems.pop()\nprint('never')\n");
}

#[test]
fn test_hook_sequence_follows_execution() {
    let source = "\
def f(n):
    if n:
        return n
    x = n
for i in range(2):
    f(i)
";
    let program = instrument(parse(source).unwrap()).program;
    let (_, result, log) = execute(HookLog::default(), &program);
    result.unwrap();

    let expected = vec![
        // f(0): falls through to line 4
        Hook::begin(6),
        Hook::begin(4),
        Hook::end(4),
        Hook::end(6),
        // f(1): returns at line 3
        Hook::begin(6),
        Hook::mark(3),
        Hook::end(6),
    ];
    assert_eq!(log.calls, expected);
}

#[test]
fn test_raising_statement_has_no_end() {
    let program = instrument(parse("try:\n    a = 1 / 0\nexcept ZeroDivisionError:\n    b = 2\n").unwrap()).program;
    let (_, result, log) = execute(HookLog::default(), &program);
    result.unwrap();
    assert_eq!(log.calls, vec![Hook::begin(2), Hook::begin(4), Hook::end(4)]);
    assert_eq!(log.abandoned, vec![2]);
}

#[test]
fn test_raise_through_call_abandons_each_open_line() {
    let source = "\
def inner():
    v = [][0]
def outer():
    w = inner()
try:
    r = outer()
except IndexError:
    pass
";
    let program = instrument(parse(source).unwrap()).program;
    let (_, result, log) = execute(HookLog::default(), &program);
    result.unwrap();
    assert_eq!(log.calls, vec![Hook::begin(6), Hook::begin(4), Hook::begin(2)]);
    assert_eq!(log.abandoned, vec![2, 4, 6]);
}
