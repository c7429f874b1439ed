mod registry_test {
    use mockall::mock;
    use std::collections::{BTreeSet, HashMap};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{mpsc, Arc, Barrier};
    use std::thread;
    use std::time::Duration;
    use trellis_di::alias_cast;
    use trellis_di::context::ElementContext;
    use trellis_di::dependency::{DependencyDefinition, ResolvedDependency};
    use trellis_di::element::{ElementSeed, ElementSource};
    use trellis_di::graph::DependencyGraph;
    use trellis_di::instance_provider::{
        ElementInstanceAnyPtr, ElementInstancePtr, TypedElementInstanceProvider,
    };
    use trellis_di::post_processor::{ElementPostProcessor, ElementPostProcessorPtr};
    use trellis_di::registry::{ElementRegistry, ElementRegistryBuilder};
    use trellis_di::resolver::DependencyResolver;
    use trellis_di::scope::Scope;
    use trellis_di::ElementInstanceProviderError;

    mock! {
        PostProcessor {}

        impl ElementPostProcessor for PostProcessor {
            fn priority(&self) -> i8;

            fn post_process(
                &self,
                context: &ElementContext,
                instance: &ElementInstanceAnyPtr,
                registry: &ElementRegistry,
                graph: &mut DependencyGraph,
            ) -> Result<(), ElementInstanceProviderError>;
        }
    }

    trait Plugin: Send + Sync {
        fn id(&self) -> &'static str;
    }

    struct TestPlugin(&'static str);

    impl Plugin for TestPlugin {
        fn id(&self) -> &'static str {
            self.0
        }
    }

    struct TestElement;

    struct CycleA {
        _b: ElementInstancePtr<CycleB>,
    }

    struct CycleB {
        _a: ElementInstancePtr<CycleA>,
    }

    struct SelfDependent {
        _this: ElementInstancePtr<SelfDependent>,
    }

    struct PluginList {
        plugins: Vec<ElementInstancePtr<dyn Plugin>>,
    }

    struct OptionalPlugin {
        plugin: Option<ElementInstancePtr<dyn Plugin>>,
    }

    impl std::fmt::Debug for OptionalPlugin {
        fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
            f.debug_struct("OptionalPlugin").finish_non_exhaustive()
        }
    }

    struct PluginMap {
        plugins: HashMap<String, ElementInstancePtr<dyn Plugin>>,
    }

    struct NamedPlugin {
        _plugin: ElementInstancePtr<dyn Plugin>,
    }

    // holds the first two resolutions until both of them arrive
    struct RendezvousResolver {
        barrier: Barrier,
        arrivals: AtomicUsize,
    }

    impl DependencyResolver for RendezvousResolver {
        fn resolve(
            &self,
            _definition: &DependencyDefinition,
            _requesting: &ElementContext,
            _registry: &ElementRegistry,
            _graph: &mut DependencyGraph,
        ) -> Option<Result<ResolvedDependency, ElementInstanceProviderError>> {
            if self.arrivals.fetch_add(1, Ordering::SeqCst) < 2 {
                self.barrier.wait();
            }

            None
        }
    }

    fn cycle_a() -> (ElementSeed, ElementSource) {
        (
            ElementSeed::new("a"),
            ElementSource::constructor(|arguments| {
                Ok(CycleA {
                    _b: arguments.take()?,
                })
            })
            .with_parameter::<ElementInstancePtr<CycleB>>(),
        )
    }

    fn cycle_b() -> (ElementSeed, ElementSource) {
        (
            ElementSeed::new("b"),
            ElementSource::constructor(|arguments| {
                Ok(CycleB {
                    _a: arguments.take()?,
                })
            })
            .with_parameter::<ElementInstancePtr<CycleA>>(),
        )
    }

    fn plugin(name: &'static str, priority: i8) -> (ElementSeed, ElementSource) {
        (
            ElementSeed::new(name).with_priority(priority),
            ElementSource::constructor(move |_| Ok(TestPlugin(name)))
                .with_alias::<dyn Plugin>(alias_cast!(TestPlugin => dyn Plugin)),
        )
    }

    fn optional_plugin() -> (ElementSeed, ElementSource) {
        (
            ElementSeed::new("optional"),
            ElementSource::constructor(|arguments| {
                Ok(OptionalPlugin {
                    plugin: arguments.take()?,
                })
            })
            .with_parameter::<Option<ElementInstancePtr<dyn Plugin>>>(),
        )
    }

    fn counting_post_processor(times: usize) -> ElementPostProcessorPtr {
        let mut post_processor = MockPostProcessor::new();
        post_processor.expect_priority().return_const(0i8);
        post_processor
            .expect_post_process()
            .times(times)
            .returning(|_, _, _, _| Ok(()));

        Box::new(post_processor)
    }

    #[test]
    fn should_share_singleton_instance() {
        let registry = ElementRegistryBuilder::default()
            .with_post_processor(counting_post_processor(1))
            .with_element(
                ElementSeed::new("element"),
                ElementSource::constructor(|_| Ok(TestElement)),
            )
            .build()
            .unwrap();

        let first = registry.primary_instance_typed::<TestElement>().unwrap();
        let second = registry
            .instance_by_name_typed::<TestElement>("element")
            .unwrap();

        assert!(Arc::ptr_eq(&first, &second));
    }

    #[test]
    fn should_create_new_prototype_instances() {
        let registry = ElementRegistryBuilder::default()
            .with_post_processor(counting_post_processor(2))
            .with_element(
                ElementSeed::new("element").with_scope(Scope::Prototype),
                ElementSource::constructor(|_| Ok(TestElement)),
            )
            .build()
            .unwrap();

        let first = registry.primary_instance_typed::<TestElement>().unwrap();
        let second = registry.primary_instance_typed::<TestElement>().unwrap();

        assert!(!Arc::ptr_eq(&first, &second));
    }

    #[test]
    fn should_detect_dependency_cycle() {
        let registry = ElementRegistryBuilder::default()
            .with_elements([cycle_a(), cycle_b()])
            .build()
            .unwrap();

        let error = registry.get("a").unwrap_err();
        let expected: BTreeSet<String> = ["a".to_string(), "b".to_string()].into_iter().collect();

        assert!(matches!(
            error.root_cause(),
            ElementInstanceProviderError::DependencyCycle(cycle) if *cycle == expected
        ));
        assert!(!registry.context_by_name("a").unwrap().has_instance());
        assert!(!registry.context_by_name("b").unwrap().has_instance());
    }

    #[test]
    fn should_detect_self_dependency() {
        let registry = ElementRegistryBuilder::default()
            .with_element(
                ElementSeed::new("a"),
                ElementSource::constructor(|arguments| {
                    Ok(SelfDependent {
                        _this: arguments.take()?,
                    })
                })
                .with_parameter::<ElementInstancePtr<SelfDependent>>(),
            )
            .build()
            .unwrap();

        let error = registry.get("a").unwrap_err();

        assert!(matches!(
            error.root_cause(),
            ElementInstanceProviderError::DependencyCycle(cycle)
                if cycle.len() == 1 && cycle.contains("a")
        ));
    }

    #[test]
    fn should_inject_collection_by_priority() {
        let registry = ElementRegistryBuilder::default()
            .with_elements([plugin("low", -1), plugin("high", 5), plugin("default", 0)])
            .with_element(
                ElementSeed::new("list"),
                ElementSource::constructor(|arguments| {
                    Ok(PluginList {
                        plugins: arguments.take()?,
                    })
                })
                .with_parameter::<Vec<ElementInstancePtr<dyn Plugin>>>(),
            )
            .build()
            .unwrap();

        let list = registry.primary_instance_typed::<PluginList>().unwrap();
        let ids: Vec<_> = list.plugins.iter().map(|plugin| plugin.id()).collect();

        assert_eq!(ids, vec!["high", "default", "low"]);
    }

    #[test]
    fn should_inject_absent_optional() {
        let (seed, source) = optional_plugin();
        let registry = ElementRegistryBuilder::default()
            .with_element(seed, source)
            .build()
            .unwrap();

        let optional = registry.primary_instance_typed::<OptionalPlugin>().unwrap();
        assert!(optional.plugin.is_none());
    }

    #[test]
    fn should_inject_present_optional() {
        let (seed, source) = optional_plugin();
        let registry = ElementRegistryBuilder::default()
            .with_elements([plugin("only", 0), (seed, source)])
            .build()
            .unwrap();

        let optional = registry.primary_instance_typed::<OptionalPlugin>().unwrap();
        assert_eq!(optional.plugin.as_ref().unwrap().id(), "only");
    }

    #[test]
    fn should_reject_ambiguous_optional() {
        let (seed, source) = optional_plugin();
        let registry = ElementRegistryBuilder::default()
            .with_elements([plugin("a", 0), plugin("b", 0), (seed, source)])
            .build()
            .unwrap();

        let error = registry
            .primary_instance_typed::<OptionalPlugin>()
            .unwrap_err();

        assert!(matches!(
            error.root_cause(),
            ElementInstanceProviderError::AmbiguousType { candidates, .. }
                if candidates == &["a".to_string(), "b".to_string()]
        ));
    }

    #[test]
    fn should_inject_primary_optional() {
        let (seed, source) = optional_plugin();
        let (primary_seed, primary_source) = plugin("b", 0);
        let registry = ElementRegistryBuilder::default()
            .with_elements([
                plugin("a", 0),
                (primary_seed.primary(), primary_source),
                (seed, source),
            ])
            .build()
            .unwrap();

        let optional = registry.primary_instance_typed::<OptionalPlugin>().unwrap();
        assert_eq!(optional.plugin.as_ref().unwrap().id(), "b");
    }

    #[test]
    fn should_inject_map_by_name() {
        let registry = ElementRegistryBuilder::default()
            .with_elements([plugin("first", 0), plugin("second", 0)])
            .with_element(
                ElementSeed::new("map"),
                ElementSource::constructor(|arguments| {
                    Ok(PluginMap {
                        plugins: arguments.take()?,
                    })
                })
                .with_parameter::<HashMap<String, ElementInstancePtr<dyn Plugin>>>(),
            )
            .build()
            .unwrap();

        let map = registry.primary_instance_typed::<PluginMap>().unwrap();

        assert_eq!(map.plugins.len(), 2);
        assert_eq!(map.plugins["first"].id(), "first");
        assert_eq!(map.plugins["second"].id(), "second");
    }

    #[test]
    fn should_fail_on_missing_named_dependency() {
        let registry = ElementRegistryBuilder::default()
            .with_element(
                ElementSeed::new("named"),
                ElementSource::constructor(|arguments| {
                    Ok(NamedPlugin {
                        _plugin: arguments.take()?,
                    })
                })
                .with_named_parameter::<ElementInstancePtr<dyn Plugin>, _>("missing"),
            )
            .build()
            .unwrap();

        let error = registry.get("named").unwrap_err();

        assert!(matches!(
            error.root_cause(),
            ElementInstanceProviderError::NoNamedInstance(name) if name == "missing"
        ));
    }

    #[test]
    fn should_skip_elements_from_inactive_profiles() {
        let (seed, source) = plugin("dev_only", 0);
        let (optional_seed, optional_source) = optional_plugin();
        let registry = ElementRegistryBuilder::default()
            .with_active_profiles(["prod"])
            .with_elements([
                (seed.with_required_profile("dev"), source),
                (optional_seed, optional_source),
            ])
            .build()
            .unwrap();

        assert!(matches!(
            registry.get("dev_only").unwrap_err(),
            ElementInstanceProviderError::NoNamedInstance(name) if name == "dev_only"
        ));

        let optional = registry.primary_instance_typed::<OptionalPlugin>().unwrap();
        assert!(optional.plugin.is_none());
    }

    #[test]
    fn should_not_cache_failed_singletons() {
        let attempts = Arc::new(AtomicUsize::new(0));
        let constructor_attempts = attempts.clone();

        let registry = ElementRegistryBuilder::default()
            .with_element(
                ElementSeed::new("flaky"),
                ElementSource::constructor(move |_| {
                    if constructor_attempts.fetch_add(1, Ordering::SeqCst) == 0 {
                        Err(ElementInstanceProviderError::NoNamedInstance(
                            "first attempt".to_string(),
                        ))
                    } else {
                        Ok(TestElement)
                    }
                }),
            )
            .build()
            .unwrap();

        assert!(registry.get("flaky").is_err());
        assert!(!registry.context_by_name("flaky").unwrap().has_instance());

        assert!(registry.get("flaky").is_ok());
        assert!(registry.context_by_name("flaky").unwrap().has_instance());
        assert_eq!(attempts.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn should_create_singleton_once_across_threads() {
        let created = Arc::new(AtomicUsize::new(0));
        let constructor_created = created.clone();

        let registry = ElementRegistryBuilder::default()
            .with_element(
                ElementSeed::new("shared"),
                ElementSource::constructor(move |_| {
                    constructor_created.fetch_add(1, Ordering::SeqCst);
                    Ok(TestElement)
                }),
            )
            .build()
            .unwrap();

        let registry = &registry;
        let instances: Vec<_> = thread::scope(|scope| {
            let handles: Vec<_> = (0..8)
                .map(|_| scope.spawn(move || registry.primary_instance_typed::<TestElement>()))
                .collect();

            handles
                .into_iter()
                .map(|handle| handle.join().unwrap().unwrap())
                .collect()
        });

        assert_eq!(created.load(Ordering::SeqCst), 1);
        assert!(instances
            .iter()
            .all(|instance| Arc::ptr_eq(instance, &instances[0])));
    }

    #[test]
    fn should_initialize_eagerly() {
        let created = Arc::new(AtomicUsize::new(0));
        let constructor_created = created.clone();

        let registry = ElementRegistryBuilder::default()
            .with_element(
                ElementSeed::new("eager"),
                ElementSource::constructor(move |_| {
                    constructor_created.fetch_add(1, Ordering::SeqCst);
                    Ok(TestElement)
                }),
            )
            .build()
            .unwrap();

        assert_eq!(created.load(Ordering::SeqCst), 0);

        registry.initialize().unwrap();
        registry.initialize().unwrap();
        registry.get("eager").unwrap();

        assert_eq!(created.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn should_detect_dependency_cycle_across_threads() {
        let registry = Arc::new(
            ElementRegistryBuilder::default()
                .with_resolver(Box::new(RendezvousResolver {
                    barrier: Barrier::new(2),
                    arrivals: AtomicUsize::new(0),
                }))
                .with_elements([cycle_a(), cycle_b()])
                .build()
                .unwrap(),
        );

        let (sender, receiver) = mpsc::channel();
        for name in ["a", "b"] {
            let registry = registry.clone();
            let sender = sender.clone();
            thread::spawn(move || {
                sender.send(registry.get(name).map(|_| ())).unwrap();
            });
        }

        let expected: BTreeSet<String> = ["a".to_string(), "b".to_string()].into_iter().collect();
        for _ in 0..2 {
            let error = receiver
                .recv_timeout(Duration::from_secs(5))
                .expect("concurrent requests didn't finish")
                .unwrap_err();

            assert!(matches!(
                error.root_cause(),
                ElementInstanceProviderError::DependencyCycle(cycle) if *cycle == expected
            ));
        }

        assert!(!registry.context_by_name("a").unwrap().has_instance());
        assert!(!registry.context_by_name("b").unwrap().has_instance());
    }

    #[test]
    fn should_detect_new_request_for_element_under_construction() {
        let mut post_processor = MockPostProcessor::new();
        post_processor.expect_priority().return_const(0i8);
        post_processor
            .expect_post_process()
            .times(1)
            .returning(|context, _, registry, _| registry.get(context.name()).map(|_| ()));

        let registry = Arc::new(
            ElementRegistryBuilder::default()
                .with_post_processor(Box::new(post_processor))
                .with_element(
                    ElementSeed::new("element"),
                    ElementSource::constructor(|_| Ok(TestElement)),
                )
                .build()
                .unwrap(),
        );

        let (sender, receiver) = mpsc::channel();
        let request_registry = registry.clone();
        thread::spawn(move || {
            sender
                .send(request_registry.get("element").map(|_| ()))
                .unwrap();
        });

        let error = receiver
            .recv_timeout(Duration::from_secs(5))
            .expect("request didn't finish")
            .unwrap_err();

        assert!(matches!(
            error.root_cause(),
            ElementInstanceProviderError::DependencyCycle(cycle)
                if cycle.len() == 1 && cycle.contains("element")
        ));
        assert!(!registry.context_by_name("element").unwrap().has_instance());
    }
}
