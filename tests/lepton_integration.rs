//! End-to-end behavior of Lepton task nodes against fake hosts.

mod common;

use std::collections::HashMap;
use std::ffi::c_void;
use std::sync::Arc;

use common::{FakeImporter, FakeLoader};
use lepton::prelude::*;
use lepton::{ARGTYPES_METADATA, TASK_METADATA};
use serde_json::json;

extern "C" fn test_func() {}

fn test_func_ptr() -> *const c_void {
    test_func as *const c_void
}

extern "C" fn add_i32(a: i32, b: i32) -> i32 {
    a + b
}

fn python_lepton(importer: &Arc<FakeImporter>, library_name: &str, function_name: &str) -> Lepton {
    Lepton::builder()
        .language("python")
        .library(library_name)
        .function(function_name)
        .importer(importer.clone())
        .defaults(Defaults::new())
        .build()
        .unwrap()
}

fn c_lepton(loader: &Arc<FakeLoader>, library_name: &str) -> LeptonBuilder {
    Lepton::builder()
        .language("C")
        .library(library_name)
        .function("test_func")
        .loader(loader.clone())
        .defaults(Defaults::new())
}

#[test]
fn test_python_wrapper_calls_module_function() {
    for library_name in ["test_module", "test_module.py"] {
        let importer = Arc::new(FakeImporter::default());
        let lepton = python_lepton(&importer, library_name, "test_func");

        let result = lepton.task().call_positional(vec![json!(1), json!(2)]).unwrap();

        assert_eq!(result, json!(3));
        assert_eq!(*importer.imports.lock().unwrap(), vec!["test_module".to_string()]);
    }
}

#[test]
fn test_python_wrapper_accepts_keyword_arguments() {
    let importer = Arc::new(FakeImporter::default());
    let lepton = python_lepton(&importer, "test_module", "test_func");

    let kwargs = HashMap::from([("y".to_string(), json!(40))]);
    let result = lepton.task().call(vec![json!(2)], kwargs).unwrap();
    assert_eq!(result, json!(42));
}

#[test]
fn test_python_wrapper_missing_module() {
    for library_name in ["bad_module", "bad_module.py"] {
        let importer = Arc::new(FakeImporter::default());
        let lepton = python_lepton(&importer, library_name, "");

        let err = lepton.task().call_positional(vec![json!(1), json!(2)]).unwrap_err();
        assert!(matches!(
            err,
            LeptonError::ModuleNotFound { ref module, .. } if module == "bad_module"
        ));
        assert!(err.is_resolution());
    }
}

#[test]
fn test_python_wrapper_missing_function() {
    let importer = Arc::new(FakeImporter::default());
    let lepton = python_lepton(&importer, "test_module", "bad_func");

    let err = lepton.task().call_positional(vec![json!(1), json!(2)]).unwrap_err();
    assert!(matches!(
        err,
        LeptonError::AttributeNotFound { ref attribute, .. } if attribute == "bad_func"
    ));
}

#[test]
fn test_python_wrapper_resolves_on_every_call() {
    let importer = Arc::new(FakeImporter::default());
    let lepton = python_lepton(&importer, "test_module", "test_func");

    lepton.task().call_positional(vec![json!(1), json!(1)]).unwrap();
    lepton.task().call_positional(vec![json!(2), json!(2)]).unwrap();
    assert_eq!(importer.imports.lock().unwrap().len(), 2);
}

#[test]
fn test_c_wrapper_void_function_returns_null() {
    let loader = Arc::new(FakeLoader::default().with_symbol("test_func", test_func_ptr()));
    let lepton = c_lepton(&loader, "test_empty.so").build().unwrap();

    let result = lepton.task().call_positional(vec![]).unwrap();

    assert_eq!(result, NodeValue::Null);
    assert_eq!(loader.loads(), vec!["test_empty.so".to_string()]);
}

#[test]
fn test_c_wrapper_rejects_keyword_arguments() {
    let loader = Arc::new(FakeLoader::default().with_symbol("test_func", test_func_ptr()));
    let lepton = c_lepton(&loader, "test_lib.so").build().unwrap();

    let kwargs = HashMap::from([("bad_kwarg".to_string(), json!("bad_value"))]);
    let err = lepton.task().call(vec![], kwargs).unwrap_err();

    assert!(matches!(
        err,
        LeptonError::KeywordArguments(ref names) if names == &["bad_kwarg".to_string()]
    ));
    assert!(err.is_invalid_argument());
    assert!(loader.loads().is_empty());
}

#[test]
fn test_c_wrapper_missing_symbol() {
    let loader = Arc::new(FakeLoader::default());
    let lepton = c_lepton(&loader, "test_lib.so").build().unwrap();

    let err = lepton.task().call_positional(vec![]).unwrap_err();
    assert!(matches!(err, LeptonError::SymbolNotFound { ref symbol, .. } if symbol == "test_func"));
}

#[test]
fn test_c_wrapper_with_declared_argtypes() {
    let loader = Arc::new(FakeLoader::default().with_symbol("test_func", add_i32 as *const c_void));
    let lepton = c_lepton(&loader, "libmath.so")
        .arg_of::<i32>(Lepton::INPUT)
        .arg_of::<i32>(Lepton::INPUT)
        .returns_of::<i32>()
        .build()
        .unwrap();

    let result = lepton.task().call_positional(vec![json!(-3), json!(10)]).unwrap();
    assert_eq!(result, json!(7));
}

#[test]
fn test_lepton_node_in_flow() {
    let importer = Arc::new(FakeImporter::default());

    let mut adder = python_lepton(&importer, "test_module.py", "test_func");
    adder.set_params(HashMap::from([("args".to_string(), json!([20, 22]))]));

    let flow = Flow::new(adder.into_node());
    let mut shared = HashMap::new();
    let action = flow.run(&mut shared);

    assert_eq!(shared.get("test_func"), Some(&json!(42)));
    assert_eq!(action, Some("default".to_string()));
}

#[test]
fn test_failed_lepton_node_takes_error_branch() {
    #[derive(Clone)]
    struct RecordFailure;

    impl NodeLogic for RecordFailure {
        fn post(
            &self,
            shared: &mut HashMap<String, NodeValue>,
            _prep_res: NodeValue,
            _exec_res: NodeValue,
        ) -> Option<String> {
            shared.insert("handled".to_string(), json!(true));
            None
        }

        fn clone_box(&self) -> Box<dyn NodeLogic> {
            Box::new(self.clone())
        }
    }

    let importer = Arc::new(FakeImporter::default());
    let missing = python_lepton(&importer, "bad_module", "test_func")
        .next_on("error", Executable::Sync(Node::new(RecordFailure)));

    let flow = Flow::new(missing);
    let mut shared = HashMap::new();
    flow.run(&mut shared);

    assert_eq!(shared.get("handled"), Some(&json!(true)));
    let message = shared.get("test_func_error").and_then(NodeValue::as_str).unwrap();
    assert!(message.contains("bad_module"));
}

#[test]
fn test_c_node_rejects_malformed_kwargs_param() {
    let loader = Arc::new(FakeLoader::default().with_symbol("test_func", test_func_ptr()));
    let lepton = c_lepton(&loader, "lib.so")
        .params(HashMap::from([("kwargs".to_string(), json!([["bad_kwarg", 1]]))]))
        .build()
        .unwrap();

    let mut shared = HashMap::new();
    let action = lepton.run(&mut shared);

    assert_eq!(action, Some("error".to_string()));
    assert!(shared.get("test_func").is_none());
    let message = shared.get("test_func_error").and_then(NodeValue::as_str).unwrap();
    assert!(message.contains("kwargs"));
    assert!(loader.loads().is_empty());
}

#[test]
fn test_python_node_rejects_scalar_args_param() {
    let importer = Arc::new(FakeImporter::default());
    let mut lepton = python_lepton(&importer, "test_module", "test_func");
    lepton.set_params(HashMap::from([("args".to_string(), json!(5))]));

    let mut shared = HashMap::new();
    let action = lepton.run(&mut shared);

    assert_eq!(action, Some("error".to_string()));
    assert!(shared.contains_key("test_func_error"));
    assert!(importer.imports.lock().unwrap().is_empty());
}

#[test]
fn test_lepton_node_carries_task_metadata() {
    let importer = Arc::new(FakeImporter::default());
    let lepton = python_lepton(&importer, "test_module.py", "test_func");

    let task = lepton.metadata(TASK_METADATA).unwrap();
    assert_eq!(task["qualname"], json!("Lepton.test_module.py.test_func"));
    assert_eq!(task["module"], json!("lepton.core.lepton.test_module.py"));
    assert_eq!(lepton.metadata(ARGTYPES_METADATA), Some(&json!([])));
}

#[tokio::test]
async fn test_async_lepton_in_async_flow() {
    let importer = Arc::new(FakeImporter::default());
    let first = Lepton::builder()
        .language("python")
        .library("test_module")
        .function("test_func")
        .importer(importer.clone())
        .params(HashMap::from([("args".to_string(), json!([1, 2]))]))
        .defaults(Defaults::new())
        .build()
        .unwrap();

    let loader = Arc::new(FakeLoader::default().with_symbol("test_func", test_func_ptr()));
    let second = c_lepton(&loader, "test_empty.so").build().unwrap();

    let graph = first.into_async().next(Executable::Sync(second.into_node()));
    let flow = AsyncFlow::new(Executable::Async(graph));
    let mut shared = HashMap::new();
    let action = flow.run(&mut shared).await;

    assert_eq!(action, Some("default".to_string()));
    assert_eq!(loader.loads(), vec!["test_empty.so".to_string()]);
    assert_eq!(shared.get("test_func"), Some(&NodeValue::Null));
    assert_eq!(importer.imports.lock().unwrap().len(), 1);
}

#[tokio::test]
async fn test_async_lepton_node() {
    let importer = Arc::new(FakeImporter::default());
    let lepton = Lepton::builder()
        .language("Python")
        .library("test_module")
        .function("test_func")
        .importer(importer.clone())
        .params(HashMap::from([
            ("args".to_string(), json!([5])),
            ("kwargs".to_string(), json!({ "y": 6 })),
        ]))
        .defaults(Defaults::new().with_executor("local"))
        .build()
        .unwrap();

    let node = lepton.into_async();
    assert_eq!(node.metadata("executor"), Some(&json!("local")));

    let mut shared = HashMap::new();
    let action = node.run(&mut shared).await;

    assert_eq!(action, Some("default".to_string()));
    assert_eq!(shared.get("test_func"), Some(&json!(11)));
}
