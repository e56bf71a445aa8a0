//! Integration tests for façade trapping and chain execution
//!
//! Covers the fast path, persistent contexts, receiver reassignment,
//! getter/setter isolation, chain cardinality and fault propagation.

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use interpose_engine::{
    ClassBuilder, Error, InterceptOptions, ObjectRef, UnwrappedPolicy, Value,
};

fn int(v: Value) -> i64 {
    v.as_int().expect("expected an int")
}

/// Bump a counter stored in the persistent context and return the new count
fn bump(persistent: &ObjectRef, key: &str) -> interpose_engine::Result<i64> {
    let count = persistent.get(key)?.as_int().unwrap_or(0) + 1;
    persistent.set(key, Value::Int(count))?;
    Ok(count)
}

fn greeter() -> ClassBuilder {
    ClassBuilder::new("Greeter")
        .field("greeting", "hello")
        .field("name", "")
        .constructor(|this, args| {
            this.set("name", args.first().cloned().unwrap_or_default())?;
            Ok(())
        })
        .method("greet", |this, _| {
            Ok(Value::from(format!("{}, {}", this.get("greeting")?, this.get("name")?)))
        })
        .read_only_property("stored_greeting", |this| this.get("greeting"))
}

// ============================================================================
// Fast path
// ============================================================================

mod fast_path {
    use super::*;

    #[test]
    fn test_unregistered_class_behaves_like_raw() {
        let class = greeter().build().unwrap();
        let g = class.construct(vec![Value::str("ada")]).unwrap();

        assert!(!g.as_object().unwrap().is_facade());
        assert_eq!(g.invoke("greet", vec![]).unwrap(), Value::str("hello, ada"));
        assert!(g.set("greeting", Value::str("hi")).unwrap());
        assert_eq!(g.invoke("greet", vec![]).unwrap(), Value::str("hi, ada"));
        assert_eq!(g.get("missing").unwrap(), Value::Undefined);
    }

    #[test]
    fn test_unregistered_members_on_wrapped_class() {
        let plain = greeter().build().unwrap().construct(vec![Value::str("x")]).unwrap();
        let wrapped = greeter()
            .access("unrelated", |ctx| ctx.next())
            .build()
            .unwrap()
            .construct(vec![Value::str("x")])
            .unwrap();

        assert!(wrapped.as_object().unwrap().is_facade());
        for obj in [&plain, &wrapped] {
            assert_eq!(obj.invoke("greet", vec![]).unwrap(), Value::str("hello, x"));
            assert!(obj.set("greeting", Value::str("yo")).unwrap());
            assert_eq!(obj.get("greeting").unwrap(), Value::str("yo"));
            assert_eq!(obj.get("missing").unwrap(), Value::Undefined);
        }
    }

    #[test]
    fn test_empty_override_is_transparent() {
        let wrapped = greeter()
            .intercept_methods("greet", std::iter::empty())
            .intercept_accesses("greeting", std::iter::empty())
            .build()
            .unwrap()
            .construct(vec![Value::str("bo")])
            .unwrap();

        assert_eq!(wrapped.invoke("greet", vec![]).unwrap(), Value::str("hello, bo"));
        assert!(wrapped.set("greeting", Value::str("hey")).unwrap());
        assert_eq!(wrapped.get("greeting").unwrap(), Value::str("hey"));
    }
}

// ============================================================================
// Persistent context
// ============================================================================

mod persistent_context {
    use super::*;

    #[test]
    fn test_counters_are_per_instance() {
        let class = greeter()
            .after("greet", |ctx, _| Ok(Value::Int(bump(ctx.persistent_context(), "calls")?)))
            .build()
            .unwrap();

        let x = class.construct(vec![Value::str("x")]).unwrap();
        let y = class.construct(vec![Value::str("y")]).unwrap();

        assert_eq!(int(x.invoke("greet", vec![]).unwrap()), 1);
        assert_eq!(int(x.invoke("greet", vec![]).unwrap()), 2);
        assert_eq!(int(y.invoke("greet", vec![]).unwrap()), 1);
    }

    #[test]
    fn test_context_shared_between_method_and_access_chains() {
        let class = greeter()
            .access("greeting", |ctx| {
                bump(ctx.persistent_context(), "touches")?;
                ctx.next()
            })
            .around("greet", |ctx| {
                let touches_before = ctx.persistent_context().get("touches")?;
                ctx.next()?;
                let touches_after = ctx.persistent_context().get("touches")?;
                Ok(Value::from(format!("{}->{}", touches_before, touches_after)))
            })
            .build()
            .unwrap();

        let g = class.construct(vec![]).unwrap();
        // greet's body reads `this.greeting` through the façade
        assert_eq!(g.invoke("greet", vec![]).unwrap(), Value::str("undefined->1"));
        assert_eq!(g.invoke("greet", vec![]).unwrap(), Value::str("1->2"));
    }

    #[test]
    fn test_context_identity_is_stable() {
        let seen: Rc<RefCell<Vec<ObjectRef>>> = Rc::new(RefCell::new(Vec::new()));
        let class = {
            let seen = seen.clone();
            greeter()
                .around("greet", move |ctx| {
                    seen.borrow_mut().push(ctx.persistent_context().clone());
                    ctx.next()
                })
                .build()
                .unwrap()
        };

        let g = class.construct(vec![]).unwrap();
        let h = class.construct(vec![]).unwrap();
        g.invoke("greet", vec![]).unwrap();
        g.invoke("greet", vec![]).unwrap();
        h.invoke("greet", vec![]).unwrap();

        let seen = seen.borrow();
        assert!(seen[0].ptr_eq(&seen[1]));
        assert!(!seen[0].ptr_eq(&seen[2]));
    }
}

// ============================================================================
// Receiver reassignment
// ============================================================================

mod receiver {
    use super::*;

    fn delegating(log: Rc<RefCell<Vec<String>>>) -> ClassBuilder {
        ClassBuilder::new("Node")
            .field("label", "")
            .field("delegate", Value::Null)
            .constructor(|this, args| {
                this.set("label", args.first().cloned().unwrap_or_default())?;
                Ok(())
            })
            .method("describe", |this, _| Ok(Value::from(format!("node {}", this.get("label")?))))
            .access("label", move |ctx| {
                log.borrow_mut().push(format!("label@{}", ctx.target().get("delegate")?.is_null()));
                if let Value::Object(delegate) = ctx.target().get("delegate")? {
                    ctx.this = Value::Object(delegate);
                }
                ctx.next()
            })
    }

    #[test]
    fn test_unchanged_this_reads_raw_instance() {
        let log = Rc::new(RefCell::new(Vec::new()));
        let class = delegating(log.clone()).build().unwrap();
        let a = class.construct(vec![Value::str("a")]).unwrap();

        assert_eq!(a.get("label").unwrap(), Value::str("a"));
        assert_eq!(log.borrow().len(), 1);
    }

    #[test]
    fn test_reassigned_this_runs_other_instances_chain() {
        let log = Rc::new(RefCell::new(Vec::new()));
        let class = delegating(log.clone()).build().unwrap();
        let x = class.construct(vec![Value::str("x")]).unwrap();
        let z = class.construct(vec![Value::str("z")]).unwrap();
        assert!(x.set("delegate", z.clone()).unwrap());

        assert_eq!(x.get("label").unwrap(), Value::str("z"));
        // x's interceptor (has a delegate), then z's (none)
        assert_eq!(*log.borrow(), vec!["label@false", "label@true"]);
    }

    #[test]
    fn test_reassigned_this_for_write() {
        let log = Rc::new(RefCell::new(Vec::new()));
        let class = delegating(log).build().unwrap();
        let x = class.construct(vec![Value::str("x")]).unwrap();
        let z = class.construct(vec![Value::str("z")]).unwrap();
        x.set("delegate", z.clone()).unwrap();

        assert!(x.set("label", Value::str("changed")).unwrap());
        assert_eq!(z.get("label").unwrap(), Value::str("changed"));
        x.set("delegate", Value::Null).unwrap();
        assert_eq!(x.get("label").unwrap(), Value::str("x"));
    }

    #[test]
    fn test_reassigned_this_in_method_chain() {
        let log = Rc::new(RefCell::new(Vec::new()));
        let other = delegating(log.clone()).build().unwrap();
        let z = other.construct(vec![Value::str("z")]).unwrap();

        let class = {
            let z = z.clone();
            ClassBuilder::new("Proxyish")
                .field("label", "p")
                .method("describe", |this, _| Ok(Value::from(format!("node {}", this.get("label")?))))
                .around("describe", move |ctx| {
                    ctx.this = z.clone();
                    ctx.next()
                })
                .build()
                .unwrap()
        };

        let p = class.construct(vec![]).unwrap();
        assert_eq!(p.invoke("describe", vec![]).unwrap(), Value::str("node z"));
        // The body read `label` through z's façade
        assert_eq!(log.borrow().len(), 1);
    }

    fn tagged(redirect_after_read: bool, other: ObjectRef) -> ClassBuilder {
        ClassBuilder::new("Tagged")
            .field("tag", "self")
            .method("who", |this, _| this.get("tag"))
            .around("who", |ctx| ctx.next())
            .access("who", move |ctx| {
                if redirect_after_read {
                    let resolved = ctx.next()?;
                    ctx.this = Value::Object(other.clone());
                    Ok(resolved)
                } else {
                    ctx.this = Value::Object(other.clone());
                    ctx.next()
                }
            })
    }

    #[test]
    fn test_access_reassigned_this_before_next_seeds_method_call() {
        let own_who = interpose_engine::Function::new("who", |this, _| {
            Ok(Value::from(format!("other's who on {}", this.get("tag")?)))
        });
        let other = ObjectRef::record_with([
            ("tag", Value::str("other")),
            ("who", Value::Function(own_who)),
        ]);
        let class = tagged(false, other).build().unwrap();
        let t = class.construct(vec![]).unwrap();

        // Resolved off the other object and called with it as `this`
        assert_eq!(
            t.invoke("who", vec![]).unwrap(),
            Value::str("other's who on other")
        );
    }

    #[test]
    fn test_access_reassigned_this_after_next_seeds_method_call() {
        let other = ObjectRef::record_with([("tag", Value::str("other"))]);
        let class = tagged(true, other).build().unwrap();
        let t = class.construct(vec![]).unwrap();

        // `who` was resolved off the raw instance, but runs against the
        // receiver the access chain finished with
        assert_eq!(t.invoke("who", vec![]).unwrap(), Value::str("other"));
        let who = t.get("who").unwrap();
        assert_eq!(who.call(&t, vec![]).unwrap(), Value::str("other"));
    }

    #[test]
    fn test_method_runs_with_facade_as_this() {
        let class = greeter()
            .getter("greeting", |_, v| Ok(Value::from(v.to_string().to_uppercase())))
            .around("greet", |ctx| ctx.next())
            .build()
            .unwrap();
        let g = class.construct(vec![Value::str("kim")]).unwrap();
        // The body's `this.greeting` goes through the getter
        assert_eq!(g.invoke("greet", vec![]).unwrap(), Value::str("HELLO, kim"));
    }

    #[test]
    fn test_recursive_method_through_facade() {
        let depth = Rc::new(Cell::new(0));
        let class = {
            let depth = depth.clone();
            ClassBuilder::new("Math")
                .method("fact", |this, args| {
                    let n = args.first().and_then(Value::as_int).unwrap_or(0);
                    if n <= 1 {
                        return Ok(Value::Int(1));
                    }
                    let rest = this.invoke("fact", vec![Value::Int(n - 1)])?;
                    Ok(Value::Int(n * rest.as_int().unwrap_or(0)))
                })
                .around("fact", move |ctx| {
                    depth.set(depth.get() + 1);
                    ctx.next()
                })
                .build()
                .unwrap()
        };

        let m = class.construct(vec![]).unwrap();
        assert_eq!(m.invoke("fact", vec![Value::Int(5)]).unwrap(), Value::Int(120));
        assert_eq!(depth.get(), 5);
    }
}

// ============================================================================
// Getter / setter isolation
// ============================================================================

mod accessors {
    use super::*;

    #[test]
    fn test_setter_only_does_not_affect_reads() {
        let class = greeter()
            .setter("greeting", |_, v| Ok(Value::from(format!("{}!", v))))
            .build()
            .unwrap();
        let g = class.construct(vec![]).unwrap();

        assert_eq!(g.get("greeting").unwrap(), Value::str("hello"));
        g.set("greeting", Value::str("hey")).unwrap();
        assert_eq!(g.get("greeting").unwrap(), Value::str("hey!"));
        assert_eq!(g.get("stored_greeting").unwrap(), Value::str("hey!"));
    }

    #[test]
    fn test_getter_only_does_not_affect_writes() {
        let reads = Rc::new(Cell::new(0));
        let class = {
            let reads = reads.clone();
            greeter()
                .getter("greeting", move |_, v| {
                    reads.set(reads.get() + 1);
                    Ok(Value::from(v.to_string().to_uppercase()))
                })
                .build()
                .unwrap()
        };
        let g = class.construct(vec![]).unwrap();

        assert!(g.set("greeting", Value::str("hey")).unwrap());
        assert_eq!(reads.get(), 0);
        // Raw storage holds the unmodified value
        assert_eq!(g.get("stored_greeting").unwrap(), Value::str("hey"));
        assert_eq!(g.get("greeting").unwrap(), Value::str("HEY"));
        assert_eq!(reads.get(), 1);
    }

    #[test]
    fn test_write_result_is_coerced() {
        let class = greeter()
            .access("greeting", |ctx| {
                if ctx.setter() && ctx.value == Value::str("forbidden") {
                    return Ok(Value::Int(0));
                }
                ctx.next()?;
                Ok(Value::str("ok"))
            })
            .build()
            .unwrap();
        let g = class.construct(vec![]).unwrap();

        assert!(!g.set("greeting", Value::str("forbidden")).unwrap());
        assert_eq!(g.get("stored_greeting").unwrap(), Value::str("hello"));
        assert!(g.set("greeting", Value::str("fine")).unwrap());
        assert_eq!(g.get("stored_greeting").unwrap(), Value::str("fine"));
    }

    #[test]
    fn test_read_value_field_is_not_the_result() {
        let class = greeter()
            .access("greeting", |ctx| {
                ctx.value = Value::str("ignored");
                ctx.next()
            })
            .build()
            .unwrap();
        let g = class.construct(vec![]).unwrap();
        assert_eq!(g.get("greeting").unwrap(), Value::str("hello"));
    }

    #[test]
    fn test_intercepted_class_accessor_without_setter() {
        let class = greeter()
            .access("stored_greeting", |ctx| ctx.next())
            .build()
            .unwrap();
        let g = class.construct(vec![]).unwrap();
        assert!(!g.set("stored_greeting", Value::str("x")).unwrap());
        assert_eq!(g.get("stored_greeting").unwrap(), Value::str("hello"));
    }
}

// ============================================================================
// Chain cardinality
// ============================================================================

mod cardinality {
    use super::*;

    #[test]
    fn test_access_once_per_read_method_once_per_call() {
        let accesses = Rc::new(Cell::new(0));
        let calls = Rc::new(Cell::new(0));
        let class = {
            let accesses = accesses.clone();
            let calls = calls.clone();
            greeter()
                .access("greet", move |ctx| {
                    accesses.set(accesses.get() + 1);
                    ctx.next()
                })
                .around("greet", move |ctx| {
                    calls.set(calls.get() + 1);
                    ctx.next()
                })
                .build()
                .unwrap()
        };
        let g = class.construct(vec![Value::str("q")]).unwrap();

        let greet = g.get("greet").unwrap();
        assert!(greet.is_callable());
        assert_eq!((accesses.get(), calls.get()), (1, 0));

        assert_eq!(greet.call(&Value::Undefined, vec![]).unwrap(), Value::str("hello, q"));
        assert_eq!(greet.call(&Value::Undefined, vec![]).unwrap(), Value::str("hello, q"));
        assert_eq!((accesses.get(), calls.get()), (1, 2));

        g.invoke("greet", vec![]).unwrap();
        assert_eq!((accesses.get(), calls.get()), (2, 3));
    }

    #[test]
    fn test_bound_wrapper_ignores_call_site_receiver() {
        let class = greeter().around("greet", |ctx| ctx.next()).build().unwrap();
        let g = class.construct(vec![Value::str("g")]).unwrap();
        let greet = g.get("greet").unwrap();

        let stranger = Value::Object(ObjectRef::record_with([
            ("greeting", Value::str("bye")),
            ("name", Value::str("s")),
        ]));
        assert_eq!(greet.call(&stranger, vec![]).unwrap(), Value::str("hello, g"));
    }

    #[test]
    fn test_swallowed_call_never_reaches_body() {
        let runs = Rc::new(Cell::new(0));
        let class = {
            let runs = runs.clone();
            ClassBuilder::new("Cache")
                .method("load", move |_, _| {
                    runs.set(runs.get() + 1);
                    Ok(Value::str("fresh"))
                })
                .around("load", |_| Ok(Value::str("cached")))
                .build()
                .unwrap()
        };
        let c = class.construct(vec![]).unwrap();
        assert_eq!(c.invoke("load", vec![]).unwrap(), Value::str("cached"));
        assert_eq!(runs.get(), 0);
    }

    #[test]
    fn test_next_twice_runs_body_twice() {
        let runs = Rc::new(Cell::new(0));
        let class = {
            let runs = runs.clone();
            ClassBuilder::new("Retry")
                .method("attempt", move |_, _| {
                    runs.set(runs.get() + 1);
                    Ok(Value::Int(runs.get()))
                })
                .around("attempt", |ctx| {
                    ctx.next()?;
                    ctx.next()
                })
                .build()
                .unwrap()
        };
        let r = class.construct(vec![]).unwrap();
        assert_eq!(r.invoke("attempt", vec![]).unwrap(), Value::Int(2));
        assert_eq!(runs.get(), 2);
    }

    #[test]
    fn test_non_callable_member_ignores_method_chain() {
        let class = greeter()
            .around("greeting", |_| Ok(Value::str("never")))
            .build()
            .unwrap();
        let g = class.construct(vec![]).unwrap();
        assert_eq!(g.get("greeting").unwrap(), Value::str("hello"));
    }
}

// ============================================================================
// Faults
// ============================================================================

mod faults {
    use super::*;

    #[test]
    fn test_body_fault_propagates_unchanged() {
        let after_ran = Rc::new(Cell::new(false));
        let class = {
            let after_ran = after_ran.clone();
            ClassBuilder::new("Failing")
                .method("explode", |_, _| Err(Error::thrown("boom")))
                .after("explode", move |_, v| {
                    after_ran.set(true);
                    Ok(v)
                })
                .around("explode", |ctx| ctx.next())
                .build()
                .unwrap()
        };
        let f = class.construct(vec![]).unwrap();
        let err = f.invoke("explode", vec![]).unwrap_err();
        assert_eq!(err.thrown_value(), Some(&Value::str("boom")));
        assert!(!after_ran.get());
    }

    #[test]
    fn test_interceptor_fault_propagates_unchanged() {
        let class = greeter()
            .access("greeting", |ctx| {
                if ctx.setter() {
                    return Err(Error::custom(std::io::Error::new(
                        std::io::ErrorKind::PermissionDenied,
                        "read only",
                    )));
                }
                ctx.next()
            })
            .build()
            .unwrap();
        let g = class.construct(vec![]).unwrap();

        let err = g.set("greeting", Value::str("x")).unwrap_err();
        let Error::Custom(inner) = err else {
            panic!("expected a custom error");
        };
        let io = inner.downcast_ref::<std::io::Error>().unwrap();
        assert_eq!(io.kind(), std::io::ErrorKind::PermissionDenied);
        assert_eq!(g.get("greeting").unwrap(), Value::str("hello"));
    }

    #[test]
    fn test_calling_non_function_member() {
        let class = greeter().access("greeting", |ctx| ctx.next()).build().unwrap();
        let g = class.construct(vec![]).unwrap();
        assert!(matches!(g.invoke("greeting", vec![]), Err(Error::TypeError(_))));
    }
}

// ============================================================================
// Options
// ============================================================================

mod options {
    use super::*;

    #[test]
    fn test_traced_chains_behave_identically() {
        let _ = tracing_subscriber::fmt()
            .with_test_writer()
            .with_max_level(tracing::Level::TRACE)
            .try_init();

        let options = InterceptOptions::from_toml_str("[intercept]\ntrace_chains = true\n").unwrap();
        let class = greeter()
            .after("greet", |_, v| Ok(Value::from(format!("{}.", v))))
            .build_with(&options)
            .unwrap();
        let g = class.construct(vec![Value::str("t")]).unwrap();
        assert_eq!(g.invoke("greet", vec![]).unwrap(), Value::str("hello, t."));
    }

    #[test]
    fn test_reject_policy_from_toml() {
        let options =
            InterceptOptions::from_toml_str("[intercept]\nunwrapped_overrides = \"reject\"\n").unwrap();
        assert_eq!(options.unwrapped_overrides, UnwrappedPolicy::Reject);

        let result = greeter()
            .getter("greeting", |_, v| Ok(v))
            .unwrapped()
            .build_with(&options);
        assert!(matches!(result, Err(Error::Config(_))));
    }
}
